//! Feeds winit window events into an [`InputState`].

use ::winit::event::{
    ElementState, KeyboardInput, MouseButton as WinitMouseButton, VirtualKeyCode, WindowEvent,
};
use glam::Vec2;

use super::{InputState, KeyCode, MouseButton, NamedKey};

/// Applies a window event; returns `true` when the event was input related.
pub fn apply_window_event(input: &InputState, event: &WindowEvent<'_>) -> bool {
    match event {
        WindowEvent::KeyboardInput { input: key, .. } => {
            apply_keyboard(input, key);
            true
        }
        WindowEvent::MouseInput { state, button, .. } => {
            apply_mouse_button(input, *state, *button);
            true
        }
        WindowEvent::CursorMoved { position, .. } => {
            input.set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            true
        }
        _ => false,
    }
}

pub fn apply_keyboard(input: &InputState, key: &KeyboardInput) {
    let Some(keycode) = key.virtual_keycode.and_then(map_keycode) else {
        return;
    };
    match key.state {
        ElementState::Pressed => input.set_key_down(keycode),
        ElementState::Released => input.set_key_up(keycode),
    }
}

pub fn apply_mouse_button(input: &InputState, state: ElementState, button: WinitMouseButton) {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Other(value) => value,
    } as u8;
    let button = MouseButton::new(index);
    match state {
        ElementState::Pressed => input.set_mouse_button_down(button),
        ElementState::Released => input.set_mouse_button_up(button),
    }
}

pub fn map_keycode(code: VirtualKeyCode) -> Option<KeyCode> {
    use VirtualKeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Return | Key::NumpadEnter => KeyCode::Named(NamedKey::Enter),
        Key::Tab => KeyCode::Named(NamedKey::Tab),
        Key::Left => KeyCode::Named(NamedKey::Left),
        Key::Right => KeyCode::Named(NamedKey::Right),
        Key::Up => KeyCode::Named(NamedKey::Up),
        Key::Down => KeyCode::Named(NamedKey::Down),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::Back => KeyCode::Named(NamedKey::Backspace),
        Key::LShift => KeyCode::Named(NamedKey::LeftShift),
        Key::RShift => KeyCode::Named(NamedKey::RightShift),
        Key::LControl => KeyCode::Named(NamedKey::LeftCtrl),
        Key::RControl => KeyCode::Named(NamedKey::RightCtrl),
        Key::Key0 => KeyCode::Digit(0),
        Key::Key1 => KeyCode::Digit(1),
        Key::Key2 => KeyCode::Digit(2),
        Key::Key3 => KeyCode::Digit(3),
        Key::Key4 => KeyCode::Digit(4),
        Key::Key5 => KeyCode::Digit(5),
        Key::Key6 => KeyCode::Digit(6),
        Key::Key7 => KeyCode::Digit(7),
        Key::Key8 => KeyCode::Digit(8),
        Key::Key9 => KeyCode::Digit(9),
        Key::A => KeyCode::Character('A'),
        Key::B => KeyCode::Character('B'),
        Key::C => KeyCode::Character('C'),
        Key::D => KeyCode::Character('D'),
        Key::E => KeyCode::Character('E'),
        Key::F => KeyCode::Character('F'),
        Key::G => KeyCode::Character('G'),
        Key::H => KeyCode::Character('H'),
        Key::I => KeyCode::Character('I'),
        Key::J => KeyCode::Character('J'),
        Key::K => KeyCode::Character('K'),
        Key::L => KeyCode::Character('L'),
        Key::M => KeyCode::Character('M'),
        Key::N => KeyCode::Character('N'),
        Key::O => KeyCode::Character('O'),
        Key::P => KeyCode::Character('P'),
        Key::Q => KeyCode::Character('Q'),
        Key::R => KeyCode::Character('R'),
        Key::S => KeyCode::Character('S'),
        Key::T => KeyCode::Character('T'),
        Key::U => KeyCode::Character('U'),
        Key::V => KeyCode::Character('V'),
        Key::W => KeyCode::Character('W'),
        Key::X => KeyCode::Character('X'),
        Key::Y => KeyCode::Character('Y'),
        Key::Z => KeyCode::Character('Z'),
        Key::F1 => KeyCode::Function(1),
        Key::F2 => KeyCode::Function(2),
        Key::F3 => KeyCode::Function(3),
        Key::F4 => KeyCode::Function(4),
        Key::F5 => KeyCode::Function(5),
        Key::F6 => KeyCode::Function(6),
        Key::F7 => KeyCode::Function(7),
        Key::F8 => KeyCode::Function(8),
        Key::F9 => KeyCode::Function(9),
        Key::F10 => KeyCode::Function(10),
        Key::F11 => KeyCode::Function(11),
        Key::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_movement_and_use_keys() {
        assert_eq!(map_keycode(VirtualKeyCode::W), Some(KeyCode::Character('W')));
        assert_eq!(
            map_keycode(VirtualKeyCode::Return),
            Some(KeyCode::Named(NamedKey::Enter))
        );
        assert_eq!(map_keycode(VirtualKeyCode::Numlock), None);
    }

    #[test]
    fn mouse_buttons_toggle_input_state() {
        let input = InputState::new();
        apply_mouse_button(&input, ElementState::Pressed, WinitMouseButton::Left);
        assert!(input.is_mouse_button_down(MouseButton::LEFT));
        input.advance_frame();
        apply_mouse_button(&input, ElementState::Released, WinitMouseButton::Left);
        assert!(input.is_mouse_button_released(MouseButton::LEFT));
    }
}
