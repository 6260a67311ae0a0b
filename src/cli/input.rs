use crossterm::event::KeyCode;

/// Single-line text field. `cursor` counts characters, not bytes.
#[derive(Default, Clone, Debug)]
pub struct LineEdit {
    pub value: String,
    pub cursor: usize,
    pub password: bool,
}

impl LineEdit {
    pub fn password() -> Self {
        Self {
            password: true,
            ..Default::default()
        }
    }

    pub fn with(s: impl Into<String>) -> Self {
        let mut edit = Self::default();
        edit.set(s);
        edit
    }

    pub fn set(&mut self, s: impl Into<String>) {
        self.value = s.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn push(&mut self, ch: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }
    pub fn left(&mut self) {
        if self.cursor > 0 { self.cursor -= 1; }
    }
    pub fn right(&mut self) {
        if self.cursor < self.value.chars().count() { self.cursor += 1; }
    }
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
    pub fn rendered(&self) -> String {
        if self.password { "*".repeat(self.value.chars().count()) } else { self.value.clone() }
    }
    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    /// Applies an editing key. Returns false for keys the field ignores.
    pub fn handle(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => self.push(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.left(),
            KeyCode::Right => self.right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_at_the_cursor() {
        let mut e = LineEdit::with("1010");
        e.left();
        e.backspace();
        e.push('2');
        assert_eq!(e.value, "1020");
    }

    #[test]
    fn multibyte_input_is_safe() {
        let mut e = LineEdit::default();
        for c in "شقة".chars() {
            e.push(c);
        }
        e.left();
        e.delete();
        assert_eq!(e.value, "شق");
        e.backspace();
        assert_eq!(e.value, "ش");
    }

    #[test]
    fn password_is_masked() {
        let mut e = LineEdit::password();
        e.set("secret");
        assert_eq!(e.rendered(), "******");
    }
}
