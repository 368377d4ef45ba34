//! ratatui-based UI.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use catalog_application::{Action, Controller, Transition};
use catalog_core::{SortOrder, StateStore, Theme};
use catalog_engine::{BookCard, RenderedView, Renderer, Segment, TagPanel};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

mod slider;
use slider::Slider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Cards,
    Search,
    Tags,
}

pub struct Ui<S> {
    controller: Controller<S>,
    renderer: Renderer<Slider>,
    view: RenderedView,
    focus: Focus,
    tag_cursor: usize,
    loading_until: Option<Instant>,
    status: Option<String>,
    cards_width: u16,
}

impl<S: StateStore> Ui<S> {
    pub fn new(controller: Controller<S>) -> Self {
        let mut renderer = Renderer::new(Slider::default());
        let ctx = controller.ctx();
        let view = renderer.draw(&ctx.visible_books(), &ctx.filter.search_term, &ctx.favorites);
        let status = ctx
            .load_error
            .as_ref()
            .map(|err| format!("Catalog unavailable: {err}"));
        Self {
            controller,
            renderer,
            view,
            focus: Focus::Cards,
            tag_cursor: 0,
            loading_until: None,
            status,
            cards_width: 120,
        }
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.controller
    }

    pub fn into_controller(self) -> Controller<S> {
        self.controller
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(())), Ok(())) => Ok(()),
            (Ok(Ok(())), Err(err)) => Err(err),
            (Ok(Err(err)), _) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let tick_rate = Duration::from_millis(50);
        let mut needs_redraw = true;

        loop {
            if let Some(until) = self.loading_until
                && Instant::now() >= until
            {
                self.loading_until = None;
                needs_redraw = true;
            }

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if self.handle_key(key) {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if self.controller.ctx().details.is_some() {
            return self.handle_details_key(key);
        }
        match self.focus {
            Focus::Search => self.handle_search_key(key),
            Focus::Tags => self.handle_tags_key(key),
            Focus::Cards => self.handle_cards_key(key),
        }
    }

    fn handle_details_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => {
                self.dispatch(Action::CloseDetails);
            }
            KeyCode::Char('f') => {
                if let Some(name) = self.controller.ctx().details.clone() {
                    self.dispatch(Action::ToggleFavorite(name));
                }
            }
            KeyCode::Char('r') => self.dispatch(Action::PickRandom),
            KeyCode::Char('q') => return true,
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        let mut term = self.controller.ctx().filter.search_term.clone();
        match key.code {
            KeyCode::Esc => self.focus = Focus::Cards,
            KeyCode::Enter => {
                self.dispatch(Action::ApplySearch);
                self.focus = Focus::Cards;
            }
            KeyCode::Backspace => {
                if term.pop().is_some() {
                    self.dispatch(Action::SetSearch(term));
                }
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if !term.is_empty() {
                    self.dispatch(Action::SetSearch(String::new()));
                }
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                term.push(ch);
                self.dispatch(Action::SetSearch(term));
            }
            _ => {}
        }
        false
    }

    fn handle_tags_key(&mut self, key: KeyEvent) -> bool {
        let panel = self.controller.ctx().tag_panel();
        let shown: Vec<(String, bool)> = panel
            .shown()
            .map(|button| (button.tag.clone(), button.disabled))
            .collect();
        let slots = shown.len() + usize::from(panel.has_more);

        match key.code {
            KeyCode::Tab | KeyCode::Esc => self.focus = Focus::Cards,
            KeyCode::Left | KeyCode::Up => {
                self.tag_cursor = self.tag_cursor.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Down => {
                if self.tag_cursor + 1 < slots {
                    self.tag_cursor += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some((tag, disabled)) = shown.get(self.tag_cursor) {
                    if !disabled {
                        self.dispatch(Action::ToggleTag(tag.clone()));
                    }
                } else if panel.has_more {
                    self.dispatch(Action::ToggleMoreTags);
                }
            }
            _ => return self.handle_common_key(key),
        }
        false
    }

    fn handle_cards_key(&mut self, key: KeyEvent) -> bool {
        let width = self.cards_width;
        match key.code {
            KeyCode::Left => self.renderer.carousel_mut().widget_mut().prev(),
            KeyCode::Right => self.renderer.carousel_mut().widget_mut().next(width),
            KeyCode::Enter => {
                if let Some(name) = self.selected_card().map(|card| card.name.clone()) {
                    self.dispatch(Action::OpenDetails(name));
                }
            }
            KeyCode::Char('f') => {
                if let Some(name) = self.selected_card().map(|card| card.name.clone()) {
                    self.dispatch(Action::ToggleFavorite(name));
                }
            }
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Tab => self.focus = Focus::Tags,
            _ => return self.handle_common_key(key),
        }
        false
    }

    fn handle_common_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('F') => self.dispatch(Action::ToggleFavoritesMode),
            KeyCode::Char('s') => self.dispatch(Action::CycleSort),
            KeyCode::Char('t') => self.dispatch(Action::ToggleTheme),
            KeyCode::Char('r') => self.dispatch(Action::PickRandom),
            KeyCode::Char('m') => self.dispatch(Action::ToggleMoreTags),
            KeyCode::Char('c') => self.dispatch(Action::ClearFilters),
            _ => {}
        }
        false
    }

    fn dispatch(&mut self, action: Action) {
        match self.controller.dispatch(action) {
            Ok(transition) => {
                if self.controller.ctx().is_ready() {
                    self.status = None;
                }
                self.after_transition(transition);
            }
            Err(err) => {
                log::warn!("{err:#}");
                self.status = Some(format!("{err:#}"));
                // The visible set was recomputed before the save failed.
                self.redraw_cards();
                self.clamp_tag_cursor();
            }
        }
    }

    fn after_transition(&mut self, transition: Transition) {
        if transition.visible_changed {
            self.redraw_cards();
        } else {
            self.view = self.controller.ctx().render();
        }
        if !transition.loading.is_zero() {
            self.loading_until = Some(Instant::now() + transition.loading);
        }
        self.clamp_tag_cursor();
    }

    fn redraw_cards(&mut self) {
        let ctx = self.controller.ctx();
        self.view = self
            .renderer
            .draw(&ctx.visible_books(), &ctx.filter.search_term, &ctx.favorites);
    }

    fn clamp_tag_cursor(&mut self) {
        let panel = self.controller.ctx().tag_panel();
        let slots = panel.shown().count() + usize::from(panel.has_more);
        self.tag_cursor = self.tag_cursor.min(slots.saturating_sub(1));
    }

    fn selected_card(&self) -> Option<&BookCard> {
        let slider = self.renderer.carousel().widget();
        if !slider.is_mounted() {
            return None;
        }
        self.view.cards().get(slider.position())
    }

    fn accent_color(&self) -> Color {
        match self.controller.ctx().theme {
            Theme::Light => Color::Blue,
            Theme::Dark => Color::Yellow,
        }
    }

    fn base_style(&self) -> Style {
        match self.controller.ctx().theme {
            Theme::Light => Style::default().fg(Color::Black).bg(Color::White),
            Theme::Dark => Style::default().fg(Color::White).bg(Color::Black),
        }
    }

    fn mark_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.accent_color())
            .add_modifier(Modifier::BOLD)
    }

    fn focus_border(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(self.accent_color())
        } else {
            Style::default()
        }
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);
        frame.render_widget(Block::default().style(self.base_style()), area);

        let panel = self.controller.ctx().tag_panel();
        let tag_lines = self.tag_lines(&panel, area.width.saturating_sub(2));
        let max_tag_height = (area.height / 3).max(3);
        let tag_height = (tag_lines.len() as u16 + 2).clamp(3, max_tag_height);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(tag_height),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(area);

        frame.render_widget(self.header(), layout[0]);
        self.draw_search(frame, layout[1]);

        let tags = Paragraph::new(Text::from(tag_lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.focus_border(Focus::Tags))
                .title("Tags"),
        );
        frame.render_widget(tags, layout[2]);

        self.cards_width = layout[3].width.saturating_sub(2);
        self.draw_cards(frame, layout[3]);

        let footer = Paragraph::new(Text::from(self.footer_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[4]);

        if self.controller.ctx().details.is_some() {
            self.draw_details(frame, area);
        }
    }

    fn header(&self) -> Paragraph<'static> {
        let ctx = self.controller.ctx();
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut spans = vec![
            Span::styled("Book Catalog", bold.fg(self.accent_color())),
            Span::raw(format!(
                "  {}/{} books",
                ctx.visible_indices().len(),
                ctx.catalog.len()
            )),
            Span::raw("  "),
            Span::styled("Sort: ", bold),
            Span::raw(ctx.filter.sort_order.label()),
        ];
        if ctx.filter.sort_order != SortOrder::Relevance {
            spans.push(Span::raw(format!(" ({})", ctx.filter.sort_order)));
        }
        spans.push(Span::raw("  "));
        spans.push(Span::styled("Theme: ", bold));
        spans.push(Span::raw(ctx.theme.to_string()));
        if ctx.filter.favorites_mode {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("\u{2605} favorites only ({})", ctx.favorites.len()),
                self.mark_style(),
            ));
        }
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
    }

    fn draw_search(&self, frame: &mut ratatui::Frame, area: Rect) {
        let term = &self.controller.ctx().filter.search_term;
        let mut spans = vec![Span::raw(term.clone())];
        if self.focus == Focus::Search {
            spans.push(Span::styled(
                "_",
                Style::default().add_modifier(Modifier::SLOW_BLINK),
            ));
        } else if term.is_empty() {
            spans.push(Span::styled(
                "press / to search",
                Style::default().fg(Color::DarkGray),
            ));
        }
        let search = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.focus_border(Focus::Search))
                .title("Search"),
        );
        frame.render_widget(search, area);
    }

    fn tag_lines(&self, panel: &TagPanel, width: u16) -> Vec<Line<'static>> {
        let tags_focused = self.focus == Focus::Tags;
        let mut chips: Vec<Span<'static>> = panel
            .shown()
            .enumerate()
            .map(|(idx, button)| {
                let label = format!("{} ({})", button.tag, button.count);
                let mut style = if button.active {
                    self.mark_style()
                } else if button.disabled {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                if tags_focused && idx == self.tag_cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Span::styled(label, style)
            })
            .collect();

        if panel.has_more {
            let label = if panel.expanded { "[show less]" } else { "[show more]" };
            let mut style = Style::default().fg(self.accent_color());
            if tags_focused && self.tag_cursor == chips.len() {
                style = style.add_modifier(Modifier::REVERSED);
            }
            chips.push(Span::styled(label, style));
        }

        wrap_chips(chips, width as usize)
    }

    fn draw_cards(&self, frame: &mut ratatui::Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.focus_border(Focus::Cards))
            .title("Books");

        if self.loading_until.is_some() {
            let loading = Paragraph::new("Loading...")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(loading, area);
            return;
        }

        let cards = match &self.view {
            RenderedView::Empty { message } => {
                let mut lines = vec![Line::raw(message.clone())];
                if let Some(err) = &self.controller.ctx().load_error {
                    lines.push(Line::raw(""));
                    lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
                } else if self.controller.ctx().filter.has_filters() {
                    lines.push(Line::raw(""));
                    lines.push(Line::raw("Tip: press c to clear all filters."));
                }
                let paragraph = Paragraph::new(Text::from(lines))
                    .alignment(Alignment::Center)
                    .block(block)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, area);
                return;
            }
            RenderedView::Cards(cards) => cards,
        };

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let slider = self.renderer.carousel().widget();
        let window = slider.window(inner.width);
        if window.is_empty() {
            return;
        }
        let slots = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, window.len() as u32); window.len()])
            .spacing(slider.spacing(inner.width))
            .split(inner);

        for (slot, idx) in window.iter().enumerate() {
            if let Some(card) = cards.get(*idx) {
                self.draw_card(frame, slots[slot], card, slot == 0, *idx, cards.len());
            }
        }
    }

    fn draw_card(
        &self,
        frame: &mut ratatui::Frame,
        area: Rect,
        card: &BookCard,
        selected: bool,
        idx: usize,
        total: usize,
    ) {
        let mark = self.mark_style();
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let mut title = segment_spans(&card.title, bold, mark);
        if card.favorite {
            title.insert(0, Span::styled("\u{2605} ", bold.fg(self.accent_color())));
        }

        let lines = vec![
            Line::from(title),
            Line::styled(card.year.clone(), Style::default().fg(Color::DarkGray)),
            Line::raw(""),
            Line::from(segment_spans(&card.description, Style::default(), mark)),
            Line::raw(""),
            Line::from(segment_spans(
                &card.tags,
                Style::default().add_modifier(Modifier::ITALIC),
                mark,
            )),
            Line::styled(card.link.clone(), Style::default().fg(Color::DarkGray)),
        ];

        let border_style = if selected && self.focus == Focus::Cards {
            Style::default().fg(self.accent_color())
        } else {
            Style::default()
        };
        let paragraph = Paragraph::new(Text::from(lines))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!("{}/{}", idx + 1, total)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_details(&self, frame: &mut ratatui::Frame, area: Rect) {
        let ctx = self.controller.ctx();
        let Some(book) = ctx.details_book() else {
            return;
        };

        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let favorite = if ctx.favorites.contains(&book.name) { "yes" } else { "no" };
        let lines = vec![
            Line::from(vec![
                Span::styled("Released: ", bold),
                Span::raw(book.release_year.clone()),
            ]),
            Line::from(vec![
                Span::styled("Tags: ", bold),
                Span::raw(book.joined_tags(", ")),
            ]),
            Line::from(vec![Span::styled("Favorite: ", bold), Span::raw(favorite)]),
            Line::raw(""),
            Line::raw(book.description.clone()),
            Line::raw(""),
            Line::from(vec![Span::styled("Cover: ", bold), Span::raw(book.image.clone())]),
            Line::from(vec![Span::styled("Link: ", bold), Span::raw(book.link.clone())]),
            Line::raw(""),
            Line::styled(
                "Esc close · f favorite · r another random pick",
                Style::default().fg(Color::DarkGray),
            ),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.accent_color()))
            .title(Span::styled(book.name.clone(), bold));
        let paragraph = Paragraph::new(Text::from(lines))
            .style(self.base_style())
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn footer_lines(&self) -> Vec<Line<'static>> {
        if let Some(status) = &self.status {
            return vec![Line::styled(status.clone(), Style::default().fg(Color::Red))];
        }
        let help = match self.focus {
            Focus::Search => "type to search · Enter apply · Backspace delete · Ctrl+u clear · Esc back",
            Focus::Tags => "←/→ move · Enter toggle tag · Tab cards · m more · c clear · q quit",
            Focus::Cards => {
                "←/→ slide · Enter details · f favorite · F favorites only · / search · Tab tags · s sort · t theme · r random · c clear · q quit"
            }
        };
        vec![Line::raw(help)]
    }
}

fn segment_spans(segments: &[Segment], base: Style, mark: Style) -> Vec<Span<'static>> {
    segments
        .iter()
        .map(|segment| {
            let style = if segment.marked { mark } else { base };
            Span::styled(segment.text.clone(), style)
        })
        .collect()
}

fn wrap_chips(chips: Vec<Span<'static>>, max_width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    for chip in chips {
        let chip_width = UnicodeWidthStr::width(chip.content.as_ref());
        if !current.is_empty() && current_width + 1 + chip_width > max_width {
            lines.push(Line::from(std::mem::take(&mut current)));
            current_width = 0;
        }
        if !current.is_empty() {
            current.push(Span::raw(" "));
            current_width += 1;
        }
        current_width += chip_width;
        current.push(chip);
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }

    if lines.is_empty() {
        vec![Line::raw("(no tags)")]
    } else {
        lines
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
