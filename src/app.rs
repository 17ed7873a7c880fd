use ratatui::layout::Rect;

use crate::conversation::Conversation;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Terminal-side state wrapped around the conversation
pub struct App {
    pub should_quit: bool,
    pub conversation: Conversation,
    pub endpoint: String,

    // Input state
    pub cursor: usize, // char position in the draft

    // Chat view state
    pub chat_scroll: u16,
    pub follow_latest: bool,
    pub chat_height: u16,      // inner height, updated during render
    pub chat_total_lines: u16, // wrapped line count, updated during render
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(conversation: Conversation, endpoint: &str) -> Self {
        Self {
            should_quit: false,
            conversation,
            endpoint: endpoint.to_string(),
            cursor: 0,
            chat_scroll: 0,
            follow_latest: true,
            chat_height: 0,
            chat_total_lines: 0,
            chat_area: None,
            animation_frame: 0,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.conversation.is_awaiting()
    }

    // Draft editing

    pub fn insert_char(&mut self, c: char) {
        let mut draft = self.conversation.draft().to_string();
        let byte_pos = char_to_byte_index(&draft, self.cursor);
        draft.insert(byte_pos, c);
        self.conversation.update_draft(draft);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let mut draft = self.conversation.draft().to_string();
        let byte_pos = char_to_byte_index(&draft, self.cursor);
        draft.remove(byte_pos);
        self.conversation.update_draft(draft);
    }

    pub fn delete_at_cursor(&mut self) {
        let mut draft = self.conversation.draft().to_string();
        if self.cursor < draft.chars().count() {
            let byte_pos = char_to_byte_index(&draft, self.cursor);
            draft.remove(byte_pos);
            self.conversation.update_draft(draft);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.conversation.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.conversation.draft().chars().count();
    }

    // Conversation actions

    /// Send the draft; jumps to the latest message when accepted
    pub fn submit(&mut self) {
        if self.conversation.submit_draft() {
            self.cursor = 0;
            self.follow_latest = true;
        }
    }

    pub fn clear_chat(&mut self) {
        self.conversation.clear();
        self.chat_scroll = 0;
        self.follow_latest = true;
    }

    /// Called on every loop iteration to pick up a reply that has arrived
    pub fn poll_reply(&mut self) {
        self.conversation.poll_reply();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else {
            self.animation_frame = 0;
        }
    }

    // Scrolling

    pub fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_latest = false;
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        if self.chat_scroll >= max {
            self.follow_latest = true;
        }
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_latest(&mut self) {
        self.follow_latest = true;
        self.chat_scroll = self.max_scroll();
    }
}
