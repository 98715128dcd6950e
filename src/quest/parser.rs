use std::collections::BTreeMap;

use log::{debug, warn};

use super::lexer::{Lexer, Token, TokenKind};
use super::QuestParseError;

/// Name of the unnamed task that runs when a quest is added.
pub const ENTRY_TASK: &str = "<entry-point>";

const DIRECTIVES: [&str; 4] = ["title", "briefing", "qrc", "qst"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Message,
    Sound,
    Video,
    Stage,
}

impl ResourceKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "message" => Some(Self::Message),
            "sound" => Some(Self::Sound),
            "video" => Some(Self::Video),
            "stage" => Some(Self::Stage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub content: String,
}

/// One `<opcode> <args...>` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDef {
    pub name: String,
    pub commands: Vec<Command>,
    pub is_event: bool,
}

/// Parsed quest source. `tasks[0]` is always the entry point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuestDef {
    pub title: String,
    pub briefing: String,
    pub background: bool,
    pub resources: BTreeMap<i64, Resource>,
    pub tasks: Vec<TaskDef>,
}

pub fn parse_quest(source: &str) -> Result<QuestDef, QuestParseError> {
    Parser {
        lexer: Lexer::new(source),
    }
    .parse()
}

/// Whether `line` opens a new section (directive, flag, resource or task
/// header) and therefore ends a running text block.
fn starts_section(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with('+') {
        return true;
    }
    let word_end = line
        .find(|c: char| c == ':' || c.is_ascii_whitespace())
        .unwrap_or(line.len());
    let (word, rest) = line.split_at(word_end);
    let word = word.to_ascii_lowercase();
    if word == "task" || word == "event" {
        return rest.trim_end().ends_with(':');
    }
    rest.trim_start().starts_with(':')
        && (DIRECTIVES.contains(&word.as_str()) || ResourceKind::parse(&word).is_some())
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<QuestDef, QuestParseError> {
        let mut def = QuestDef::default();
        loop {
            self.lexer.skip_separators()?;
            let token = self.lexer.next_token()?;
            let word = match &token.kind {
                TokenKind::EndOfFile => break,
                TokenKind::Identifier(word) => word.clone(),
                _ => return Err(QuestParseError::new(token.offset, "expected a directive")),
            };
            if let Some(flag) = word.strip_prefix('+') {
                match flag.to_ascii_lowercase().as_str() {
                    "background" => def.background = true,
                    _ => warn!("ignoring unknown quest flag '+{flag}'"),
                }
                continue;
            }
            self.expect(":")?;
            match word.to_ascii_lowercase().as_str() {
                "title" => def.title = self.lexer.rest_of_line(),
                "briefing" => def.briefing = self.text_block(),
                "qrc" => self.resources(&mut def.resources)?,
                "qst" => def.tasks = self.tasks()?,
                _ => {
                    return Err(QuestParseError::new(
                        token.offset,
                        format!("undefined directive '{word}'"),
                    ))
                }
            }
        }
        if def.tasks.is_empty() {
            def.tasks.push(TaskDef {
                name: ENTRY_TASK.to_string(),
                commands: Vec::new(),
                is_event: false,
            });
        }
        Ok(def)
    }

    fn expect(&mut self, text: &str) -> Result<Token, QuestParseError> {
        let token = self.lexer.next_token()?;
        if token.is_identifier(text) {
            Ok(token)
        } else {
            Err(QuestParseError::new(
                token.offset,
                format!("expected '{text}', found {:?}", token.kind),
            ))
        }
    }

    fn integer(&mut self) -> Result<i64, QuestParseError> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::Integer(value) => Ok(value),
            other => Err(QuestParseError::new(
                token.offset,
                format!("expected a number, found {other:?}"),
            )),
        }
    }

    fn word(&mut self) -> Result<String, QuestParseError> {
        let token = self.lexer.next_token()?;
        token
            .word()
            .ok_or_else(|| QuestParseError::new(token.offset, "expected a name"))
    }

    /// Rest of the current line plus every following line up to a blank
    /// line or the start of the next section.
    fn text_block(&mut self) -> String {
        let mut lines = vec![self.lexer.rest_of_line()];
        while let Some(next) = self.lexer.peek_next_line() {
            if next.trim().is_empty() || starts_section(next) {
                break;
            }
            self.lexer.skip_newline();
            lines.push(self.lexer.rest_of_line());
        }
        lines.join("\n").trim().to_string()
    }

    fn resources(&mut self, out: &mut BTreeMap<i64, Resource>) -> Result<(), QuestParseError> {
        loop {
            self.lexer.skip_separators()?;
            let token = self.lexer.peek_token()?;
            let kind = match &token.kind {
                TokenKind::Identifier(word) => ResourceKind::parse(word),
                _ => None,
            };
            let Some(kind) = kind else {
                return Ok(());
            };
            self.lexer.next_token()?;
            self.expect(":")?;
            let id = self.integer()?;
            let content = self.text_block();
            out.insert(id, Resource { kind, content });
        }
    }

    fn tasks(&mut self) -> Result<Vec<TaskDef>, QuestParseError> {
        let mut tasks = vec![TaskDef {
            name: ENTRY_TASK.to_string(),
            commands: self.commands()?,
            is_event: false,
        }];
        loop {
            self.lexer.skip_separators()?;
            let token = self.lexer.peek_token()?;
            let is_event = if token.is_identifier("task") {
                false
            } else if token.is_identifier("event") {
                true
            } else {
                break;
            };
            self.lexer.next_token()?;
            let name = self.word()?;
            self.expect(":")?;
            let commands = self.commands()?;
            debug!(
                "{} '{name}' has been added",
                if is_event { "event" } else { "task" }
            );
            tasks.push(TaskDef {
                name,
                commands,
                is_event,
            });
        }
        Ok(tasks)
    }

    fn commands(&mut self) -> Result<Vec<Command>, QuestParseError> {
        let mut commands = Vec::new();
        loop {
            self.lexer.skip_separators()?;
            let token = self.lexer.peek_token()?;
            let TokenKind::Identifier(name) = &token.kind else {
                break;
            };
            if token.is_identifier("task") || token.is_identifier("event") {
                break;
            }
            let mut ahead = self.lexer;
            ahead.next_token()?;
            if ahead.next_token()?.is_identifier(":") {
                break;
            }

            self.lexer.next_token()?;
            let mut args = Vec::new();
            while let Some(arg) = self.lexer.peek_token()?.word() {
                self.lexer.next_token()?;
                args.push(arg);
            }
            commands.push(Command {
                name: name.to_ascii_lowercase(),
                args,
                offset: token.offset,
            });
        }
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
title: The lost key
+background
briefing: Find the key
somewhere in the woods.

qrc:
  stage: 1 go there
  message: 2 Hello %name%!
qst:
  timer t 100   $- arm it below
  fire t
  done t
  stage 1
  when (t + 1) equals 1

task cleanup:
  finish

event bell:
  pop n
  invoke notify (rang n times)
";

    #[test]
    fn parses_every_section() {
        let def = parse_quest(SAMPLE).unwrap();
        assert_eq!(def.title, "The lost key");
        assert!(def.background);
        assert_eq!(def.briefing, "Find the key\nsomewhere in the woods.");
        assert_eq!(def.resources.len(), 2);
        assert_eq!(def.resources[&1].kind, ResourceKind::Stage);
        assert_eq!(def.resources[&1].content, "go there");
        assert_eq!(def.resources[&2].content, "Hello %name%!");

        let names: Vec<&str> = def.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![ENTRY_TASK, "cleanup", "bell"]);
        assert!(def.tasks[2].is_event && !def.tasks[1].is_event);

        let entry = &def.tasks[0].commands;
        assert_eq!(entry.len(), 5);
        assert_eq!(entry[0].args, vec!["t", "100"]);
        assert_eq!(entry[4].args, vec!["(t + 1)", "equals", "1"]);
        assert_eq!(def.tasks[2].commands[1].args, vec!["notify", "(rang n times)"]);
    }

    #[test]
    fn single_newline_sections_are_split() {
        let def = parse_quest("title: test\nqrc:\n  stage: 1 go there\nqst:\n  stage 1\n  finish\n")
            .unwrap();
        assert_eq!(def.resources[&1].content, "go there");
        assert_eq!(def.tasks[0].commands.len(), 2);
    }

    #[test]
    fn errors_carry_byte_offsets() {
        let err = parse_quest("title: x\nnonsense: y").unwrap_err();
        assert_eq!(err.offset, 9);
        let err = parse_quest("qrc:\n  stage: one go").unwrap_err();
        assert_eq!(err.offset, 14);
        assert!(parse_quest("qst:\n  when (a\n").is_err());
    }

    #[test]
    fn missing_task_block_still_has_an_entry_point() {
        let def = parse_quest("title: empty").unwrap();
        assert_eq!(def.tasks.len(), 1);
        assert_eq!(def.tasks[0].name, ENTRY_TASK);
    }
}
