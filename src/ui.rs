use ratatui::{
    layout::{Constraint, Layout},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;
use crate::model::SortOrder;
use crate::theme::ThemeColors;

/// Render the application UI: tree panel above a one-line status bar.
pub fn render(app: &mut App, theme: &ThemeColors, frame: &mut Frame) {
    let [tree_area, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    // Keep the selected row inside the viewport (borders take two lines).
    let visible_height = tree_area.height.saturating_sub(2) as usize;
    app.update_scroll(visible_height);

    let title = format!(" {} ", app.root_dir.display());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(ratatui::style::Style::default().fg(theme.border_fg));

    let tree = TreeWidget::new(
        &app.visible,
        app.selected_index,
        app.scroll_offset,
        theme,
        app.use_icons,
    )
    .block(block);
    frame.render_widget(tree, tree_area);

    let arrow = match app.sort_order() {
        SortOrder::Ascending => "↑",
        SortOrder::Descending => "↓",
    };
    let sort_info = format!("sort: {} {} ", app.sort_by(), arrow);
    let path_str = app
        .selected_row()
        .and_then(|row| row.path.as_ref())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| app.root_dir.display().to_string());

    let mut status = StatusBarWidget::new(&path_str, &sort_info, theme)
        .marked_count(app.marked().len());
    if app.watcher_active {
        status = status.watcher_status("watch");
    }
    if let Some((ref msg, _)) = app.status_message {
        status = status.status_message(msg, false);
    }
    frame.render_widget(status, status_area);
}
