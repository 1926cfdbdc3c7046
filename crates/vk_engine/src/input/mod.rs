//! Keyboard input
//!
//! Key-down events set bits in a pending [`MoveFlags`] accumulator and queue
//! discrete requests (select, reset, axis toggle). The engine drains both once
//! per frame with [`InputState::take`].

use bitflags::bitflags;

bitflags! {
    /// Camera movements requested since the last frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveFlags: u32 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const UP = 1 << 2;
        const DOWN = 1 << 3;
        const YAW_LEFT = 1 << 4;
        const YAW_RIGHT = 1 << 5;
        const PITCH_UP = 1 << 6;
        const PITCH_DOWN = 1 << 7;
    }
}

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Number row 1-9
    Digit(u8),
    Space,
    Left,
    Right,
    Up,
    Down,
    A,
    D,
    W,
    S,
    X,
    R,
    Escape,
}

impl KeyCode {
    /// Map a glfw key, ignoring keys the viewer does not use
    pub fn from_glfw(key: glfw::Key) -> Option<Self> {
        use glfw::Key;

        let code = match key {
            Key::Num1 => Self::Digit(1),
            Key::Num2 => Self::Digit(2),
            Key::Num3 => Self::Digit(3),
            Key::Num4 => Self::Digit(4),
            Key::Num5 => Self::Digit(5),
            Key::Num6 => Self::Digit(6),
            Key::Num7 => Self::Digit(7),
            Key::Num8 => Self::Digit(8),
            Key::Num9 => Self::Digit(9),
            Key::Space => Self::Space,
            Key::Left => Self::Left,
            Key::Right => Self::Right,
            Key::Up => Self::Up,
            Key::Down => Self::Down,
            Key::A => Self::A,
            Key::D => Self::D,
            Key::W => Self::W,
            Key::S => Self::S,
            Key::X => Self::X,
            Key::R => Self::R,
            Key::Escape => Self::Escape,
            _ => return None,
        };
        Some(code)
    }
}

/// Object selection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based object index
    Index(usize),
    /// Advance to the next object, wrapping
    Next,
}

/// Everything requested since the previous frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingInput {
    /// Camera moves held this frame
    pub moves: MoveFlags,
    /// Latest selection request
    pub selection: Option<Selection>,
    /// Swap the plane the arrow keys move in
    pub toggle_axis: bool,
    /// Clear the camera offset
    pub reset_camera: bool,
}

/// Input accumulator fed by window events
#[derive(Debug, Default)]
pub struct InputState {
    pending: PendingInput,
    quit_requested: bool,
}

impl InputState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one key-down event
    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Digit(n @ 1..=9) => self.pending.selection = Some(Selection::Index(n as usize - 1)),
            KeyCode::Digit(_) => {}
            KeyCode::Space => self.pending.selection = Some(Selection::Next),
            KeyCode::Left => self.pending.moves |= MoveFlags::LEFT,
            KeyCode::Right => self.pending.moves |= MoveFlags::RIGHT,
            KeyCode::Up => self.pending.moves |= MoveFlags::UP,
            KeyCode::Down => self.pending.moves |= MoveFlags::DOWN,
            KeyCode::A => self.pending.moves |= MoveFlags::YAW_LEFT,
            KeyCode::D => self.pending.moves |= MoveFlags::YAW_RIGHT,
            KeyCode::W => self.pending.moves |= MoveFlags::PITCH_UP,
            KeyCode::S => self.pending.moves |= MoveFlags::PITCH_DOWN,
            KeyCode::X => self.pending.toggle_axis = !self.pending.toggle_axis,
            KeyCode::R => self.pending.reset_camera = true,
            KeyCode::Escape => self.quit_requested = true,
        }
    }

    /// Drain pending requests for this frame
    pub fn take(&mut self) -> PendingInput {
        std::mem::take(&mut self.pending)
    }

    /// Whether Escape was pressed
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}
