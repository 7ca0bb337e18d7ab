use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

/// Status bar widget: current path, sort mode, mark count, watcher state,
/// or a transient status message.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    sort_info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    marked_count: usize,
    watcher_status: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, sort_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            sort_info,
            theme,
            status_message: None,
            is_error: false,
            marked_count: 0,
            watcher_status: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn marked_count(mut self, count: usize) -> Self {
        self.marked_count = count;
        self
    }

    pub fn watcher_status(mut self, status: &'a str) -> Self {
        self.watcher_status = Some(status);
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default().fg(self.theme.accent_fg)
            };

            // Pad or truncate message to fill full width
            let display: String = if msg.len() >= width {
                msg[..width].to_string()
            } else {
                format!("{:<width$}", msg, width = width)
            };

            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [path] ... [marks] [watcher] [sort]
        let sort_len = self.sort_info.len();
        let remaining = width.saturating_sub(sort_len);

        let path_display = if self.path_str.len() > remaining {
            if remaining > 3 {
                format!(
                    "...{}",
                    &self.path_str[self.path_str.len() - (remaining - 3)..]
                )
            } else {
                String::new()
            }
        } else {
            self.path_str.to_string()
        };

        let path_style = Style::default().fg(self.theme.status_fg);
        let sort_style = Style::default()
            .fg(self.theme.dim_fg)
            .add_modifier(Modifier::DIM);

        let mut spans = vec![Span::styled(path_display, path_style)];

        if self.marked_count > 0 {
            let marks = format!(" ● {} marked", self.marked_count);
            spans.push(Span::styled(
                marks,
                Style::default()
                    .fg(self.theme.tree_marked_fg)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        if let Some(watcher_str) = self.watcher_status {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                watcher_str.to_string(),
                Style::default().fg(self.theme.accent_fg),
            ));
        }

        // Pad to push the sort info to the right edge.
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let pad = width.saturating_sub(used).saturating_sub(sort_len);
        if pad > 0 {
            spans.push(Span::raw(" ".repeat(pad)));
        }
        spans.push(Span::styled(self.sort_info.to_string(), sort_style));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
