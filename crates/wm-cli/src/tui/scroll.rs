//! Scroll position of the message list.

/// Scroll offset that follows new messages until the user scrolls away.
///
/// Content and viewport heights are refreshed on every frame; the offset is
/// clamped whenever either changes so a resize or sidebar toggle never leaves
/// it past the end.
#[derive(Debug, Clone)]
pub struct ScrollState {
    offset: u16,
    content_height: u16,
    viewport_height: u16,
    follow: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            content_height: 0,
            viewport_height: 0,
            follow: true,
        }
    }
}

impl ScrollState {
    pub fn offset(&self) -> u16 {
        if self.follow {
            self.max_offset()
        } else {
            self.offset.min(self.max_offset())
        }
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Record the heights measured for the current frame.
    pub fn resize(&mut self, content_height: u16, viewport_height: u16) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        self.offset = if self.follow {
            self.max_offset()
        } else {
            self.offset.min(self.max_offset())
        };
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.offset = self.offset().saturating_sub(amount);
        self.follow = false;
    }

    /// Scrolling back to the end resumes following.
    pub fn scroll_down(&mut self, amount: u16) {
        let max = self.max_offset();
        self.offset = self.offset().saturating_add(amount).min(max);
        self.follow = self.offset >= max;
    }

    pub fn page_up(&mut self) {
        self.scroll_up((self.viewport_height / 2).max(5));
    }

    pub fn page_down(&mut self) {
        self.scroll_down((self.viewport_height / 2).max(5));
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.follow = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
        self.follow = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follows_new_content() {
        let mut state = ScrollState::default();
        state.resize(50, 20);
        assert_eq!(state.offset(), 30);

        state.resize(60, 20);
        assert_eq!(state.offset(), 40);
    }

    #[test]
    fn test_manual_scroll_stops_following() {
        let mut state = ScrollState::default();
        state.resize(50, 20);
        state.scroll_up(10);

        assert!(!state.is_following());
        assert_eq!(state.offset(), 20);

        // New content does not move a pinned view
        state.resize(80, 20);
        assert_eq!(state.offset(), 20);
    }

    #[test]
    fn test_viewport_growth_clamps_offset() {
        let mut state = ScrollState::default();
        state.resize(50, 20);
        state.scroll_up(1); // offset 29

        state.resize(50, 40); // max offset 10
        assert_eq!(state.offset(), 10);
    }

    #[test]
    fn test_scroll_down_to_end_resumes_following() {
        let mut state = ScrollState::default();
        state.resize(100, 20);
        state.scroll_to_top();

        state.page_down();
        assert_eq!(state.offset(), 10);
        assert!(!state.is_following());

        state.scroll_down(1000);
        assert!(state.is_following());
        assert_eq!(state.offset(), 80);
    }

    #[test]
    fn test_short_content_never_scrolls() {
        let mut state = ScrollState::default();
        state.resize(5, 20);
        state.page_down();
        assert_eq!(state.offset(), 0);
        state.page_up();
        assert_eq!(state.offset(), 0);
    }
}
