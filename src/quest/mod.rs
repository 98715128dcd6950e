//! Quest scripting: a line-oriented task language with timers, stages,
//! typed variables and event tasks.
//!
//! Sources are parsed once into a [`QuestDef`]; the [`QuestManager`] keeps
//! the running [`Quest`] instances and advances them once per tick. Commands
//! are plain function pointers looked up by opcode, so games can add their
//! own with [`QuestManager::register_command`].

mod commands;
mod expr;
mod lexer;
mod manager;
mod parser;
mod vector;
mod vm;

pub use expr::{evaluate, ExprError};
pub use lexer::{Lexer, Token, TokenKind};
pub use manager::{
    expect_args, expect_min_args, CommandContext, CustomVariables, QuestCommand, QuestHost,
    QuestManager,
};
pub use parser::{parse_quest, Command, QuestDef, Resource, ResourceKind, TaskDef, ENTRY_TASK};
pub use vm::{Quest, QuestId, QuestState, QuestVar, Stage, Task, Timer};

use thiserror::Error;

/// Parse failure with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("quest parse error at byte {offset}: {message}")]
pub struct QuestParseError {
    pub offset: usize,
    pub message: String,
}

impl QuestParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Failures of quest commands and of quest loading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuestError {
    #[error("needs '{need}' arguments, got: '{got}'")]
    ArgCount { need: usize, got: usize },
    #[error("argument '{arg}' has to be '{need}'")]
    ArgType { arg: String, need: &'static str },
    #[error("{thing} '{name}' could not be found")]
    NotFound { thing: &'static str, name: String },
    #[error("division by zero")]
    DivideByZero,
    #[error("argument has to be one of 'above,below,equals,!equals,and,or,xor', got: '{0}'")]
    BadComparator(String),
    #[error("event's arg stack is already empty")]
    EventArgsEmpty,
    #[error("unrecognized command")]
    UnknownCommand,
    #[error("quest '{0}' could not be found")]
    MissingQuest(String),
    #[error("maximum number of quests ({0}) has been reached")]
    TooManyQuests(usize),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error(transparent)]
    Parse(#[from] QuestParseError),
}
