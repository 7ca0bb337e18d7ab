use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::RowLine;
use crate::theme::ThemeColors;

/// Tree widget that renders the flattened row list with box-drawing
/// characters. Each `RowLine` carries its ancestor guide flags, so the
/// prefix is assembled without re-walking the tree.
pub struct TreeWidget<'a> {
    rows: &'a [RowLine],
    selected_index: usize,
    scroll_offset: usize,
    theme: &'a ThemeColors,
    use_icons: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(
        rows: &'a [RowLine],
        selected_index: usize,
        scroll_offset: usize,
        theme: &'a ThemeColors,
        use_icons: bool,
    ) -> Self {
        Self {
            rows,
            selected_index,
            scroll_offset,
            theme,
            use_icons,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Build the indentation prefix for a row from its guide flags.
    fn build_prefix(row: &RowLine) -> String {
        if row.depth == 0 {
            return String::new();
        }
        let mut parts: Vec<&str> = Vec::new();
        for &continues in &row.guides {
            parts.push(if continues { "│  " } else { "   " });
        }
        parts.push(if row.is_last { "└──" } else { "├──" });
        parts.join("")
    }

    /// Get the directory/file indicator for a row.
    fn row_indicator(&self, row: &RowLine) -> String {
        if row.is_placeholder {
            return String::new();
        }
        if self.use_icons {
            if row.is_dir {
                if row.is_expanded {
                    " ".to_string()
                } else {
                    " ".to_string()
                }
            } else {
                format!("{} ", row.icon)
            }
        } else if row.is_dir {
            "[D] ".to_string()
        } else {
            "[F] ".to_string()
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let visible_height = inner_area.height as usize;
        if self.rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible_rows = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (i, (idx, row)) in visible_rows.enumerate() {
            let y = inner_area.y + i as u16;
            if y >= inner_area.y + inner_area.height {
                break;
            }

            let prefix = Self::build_prefix(row);
            let indicator = self.row_indicator(row);

            let is_selected = idx == self.selected_index;
            let style = if is_selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if row.is_placeholder {
                Style::default()
                    .fg(self.theme.tree_placeholder_fg)
                    .add_modifier(Modifier::ITALIC)
            } else if row.is_marked {
                Style::default()
                    .fg(self.theme.tree_marked_fg)
                    .add_modifier(Modifier::BOLD)
            } else if row.is_hidden {
                Style::default().fg(self.theme.tree_hidden_fg)
            } else if row.is_dir {
                Style::default()
                    .fg(self.theme.tree_dir_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_file_fg)
            };

            let marker = if row.is_marked { "● " } else { "" };
            let line_content = format!("{}{}{}{}", prefix, marker, indicator, row.name);
            let line = Line::from(Span::styled(line_content, style));
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}
