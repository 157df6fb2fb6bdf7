use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{
    Component, EventContext, EventKind, EventRoutingState, HandlerResponse, RenderContext,
};
use tui_dispatch_components::style::BorderStyle;
use tui_dispatch_components::{
    BaseStyle, Padding, SelectList, SelectListBehavior, SelectListProps, SelectListStyle,
    SelectionStyle, StatusBar, StatusBarHint, StatusBarItem, StatusBarProps, StatusBarSection,
    StatusBarStyle,
};

use crate::action::Action;
use crate::state::{AppState, FocusArea, PokemonRecord};

const BG_BASE: Color = Color::Rgb(14, 17, 23);
const BG_PANEL: Color = Color::Rgb(22, 27, 34);
const BG_HIGHLIGHT: Color = Color::Rgb(38, 70, 83);
const TEXT_MAIN: Color = Color::Rgb(230, 237, 243);
const TEXT_DIM: Color = Color::Rgb(139, 148, 158);
const ACCENT: Color = Color::Rgb(247, 208, 44);

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(tui_dispatch::ComponentId, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DexComponentId {
    List,
    Detail,
    Evolution,
    Search,
}

#[derive(tui_dispatch::BindingContext, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DexContext {
    List,
    Detail,
    Evolution,
    Search,
}

impl EventRoutingState<DexComponentId, DexContext> for AppState {
    fn focused(&self) -> Option<DexComponentId> {
        if self.search.active {
            return Some(DexComponentId::Search);
        }
        match self.focus {
            FocusArea::List => Some(DexComponentId::List),
            FocusArea::Detail => Some(DexComponentId::Detail),
            FocusArea::Evolution => Some(DexComponentId::Evolution),
        }
    }

    fn modal(&self) -> Option<DexComponentId> {
        if self.search.active {
            Some(DexComponentId::Search)
        } else {
            None
        }
    }

    fn binding_context(&self, id: DexComponentId) -> DexContext {
        match id {
            DexComponentId::List => DexContext::List,
            DexComponentId::Detail => DexContext::Detail,
            DexComponentId::Evolution => DexContext::Evolution,
            DexComponentId::Search => DexContext::Search,
        }
    }

    fn default_context(&self) -> DexContext {
        DexContext::List
    }
}

pub struct DexUi {
    list: SelectList,
    evolution_list: SelectList,
    status_bar: StatusBar,
}

impl Default for DexUi {
    fn default() -> Self {
        Self::new()
    }
}

impl DexUi {
    pub fn new() -> Self {
        Self {
            list: SelectList::new(),
            evolution_list: SelectList::new(),
            status_bar: StatusBar::new(),
        }
    }

    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        _render_ctx: RenderContext,
        event_ctx: &mut EventContext<DexComponentId>,
    ) {
        frame.render_widget(
            Block::default().style(Style::default().bg(BG_BASE)),
            area,
        );
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(area);

        render_header(frame, layout[0], state, event_ctx);
        render_body(
            frame,
            layout[1],
            state,
            event_ctx,
            &mut self.list,
            &mut self.evolution_list,
        );
        render_footer(frame, layout[2], state, &mut self.status_bar);
    }

    pub fn handle_list_event(
        &mut self,
        event: &EventKind,
        state: &AppState,
    ) -> HandlerResponse<Action> {
        handle_list_event(event, state, &mut self.list)
    }

    pub fn handle_detail_event(
        &mut self,
        event: &EventKind,
        state: &AppState,
    ) -> HandlerResponse<Action> {
        handle_detail_event(event, state)
    }

    pub fn handle_evolution_event(
        &mut self,
        event: &EventKind,
        state: &AppState,
    ) -> HandlerResponse<Action> {
        handle_evolution_event(event, state, &mut self.evolution_list)
    }

    pub fn handle_search_event(
        &mut self,
        event: &EventKind,
        state: &AppState,
    ) -> HandlerResponse<Action> {
        handle_search_event(event, state)
    }
}

pub fn handle_list_event(
    event: &EventKind,
    state: &AppState,
    list: &mut SelectList,
) -> HandlerResponse<Action> {
    let actions = match event {
        EventKind::Key(key) => match key.code {
            crossterm::event::KeyCode::PageDown => vec![Action::SelectionPage(1)],
            crossterm::event::KeyCode::PageUp => vec![Action::SelectionPage(-1)],
            crossterm::event::KeyCode::Char('m') => vec![Action::LoadMore],
            crossterm::event::KeyCode::Esc if state.search_results.is_some() => {
                vec![Action::SearchClear]
            }
            _ => {
                let items = list_items(state);
                let props = SelectListProps {
                    items: &items,
                    count: items.len(),
                    selected: state.selected_index.min(items.len().saturating_sub(1)),
                    is_focused: true,
                    style: list_style(),
                    behavior: SelectListBehavior {
                        show_scrollbar: true,
                        wrap_navigation: false,
                    },
                    on_select: Action::Select,
                    render_item: &|item| item.clone(),
                };
                let actions: Vec<_> = list.handle_event(event, props).into_iter().collect();
                return handler_response(actions);
            }
        },
        EventKind::Scroll { delta, .. } => vec![Action::SelectionMove((*delta * 3) as i16)],
        _ => vec![],
    };
    handler_response(actions)
}

pub fn handle_detail_event(event: &EventKind, _state: &AppState) -> HandlerResponse<Action> {
    let actions = match event {
        EventKind::Key(key) => match key.code {
            crossterm::event::KeyCode::Up | crossterm::event::KeyCode::Char('k') => {
                vec![Action::FlavorScroll(-1)]
            }
            crossterm::event::KeyCode::Down | crossterm::event::KeyCode::Char('j') => {
                vec![Action::FlavorScroll(1)]
            }
            _ => vec![],
        },
        EventKind::Scroll { delta, .. } => vec![Action::FlavorScroll(*delta as i16)],
        _ => vec![],
    };
    handler_response(actions)
}

pub fn handle_evolution_event(
    event: &EventKind,
    state: &AppState,
    evolution_list: &mut SelectList,
) -> HandlerResponse<Action> {
    if let EventKind::Key(key) = event {
        if key.code == crossterm::event::KeyCode::Enter {
            return handler_response(vec![Action::EvolutionJump(
                state.evolution_selected_index,
            )]);
        }
    }
    let items = evolution_items(state);
    if items.is_empty() {
        return HandlerResponse::ignored();
    }
    let props = SelectListProps {
        items: &items,
        count: items.len(),
        selected: state
            .evolution_selected_index
            .min(items.len().saturating_sub(1)),
        is_focused: true,
        style: evolution_style(),
        behavior: SelectListBehavior {
            show_scrollbar: false,
            wrap_navigation: false,
        },
        on_select: Action::EvolutionSelect,
        render_item: &|item| item.clone(),
    };
    let actions: Vec<_> = evolution_list
        .handle_event(event, props)
        .into_iter()
        .collect();
    handler_response(actions)
}

pub fn handle_search_event(event: &EventKind, _state: &AppState) -> HandlerResponse<Action> {
    let actions = match event {
        EventKind::Key(key) => match key.code {
            crossterm::event::KeyCode::Esc => vec![Action::SearchCancel],
            crossterm::event::KeyCode::Enter => vec![Action::SearchSubmit],
            crossterm::event::KeyCode::Backspace => vec![Action::SearchBackspace],
            crossterm::event::KeyCode::Char(ch) => vec![Action::SearchInput(ch)],
            _ => vec![],
        },
        _ => vec![],
    };
    handler_response(actions)
}

fn handler_response(actions: Vec<Action>) -> HandlerResponse<Action> {
    if actions.is_empty() {
        HandlerResponse::ignored()
    } else {
        HandlerResponse {
            actions,
            consumed: true,
            needs_render: false,
        }
    }
}

fn render_header(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    event_ctx: &mut EventContext<DexComponentId>,
) {
    if state.search.active {
        event_ctx.set_component_area(DexComponentId::Search, area);
    }
    let search = if state.search.active {
        format!("/{}_", state.search.query)
    } else if state.search.query.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", state.search.query)
    };
    let mode = if state.search_results.is_some() {
        "RESULTS"
    } else {
        "BROWSE"
    };
    let spinner = if state.batch_loading
        || state.search_loading
        || state.catalog_loading
        || state.evolution_loading
        || state.sprite_loading
    {
        SPINNER[(state.tick % SPINNER.len() as u64) as usize]
    } else {
        " "
    };
    let header_text = Line::from(vec![
        Span::styled(
            mode,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {} shown", state.visible_records().len())),
        Span::raw("  |  Search: "),
        Span::styled(search, Style::default().fg(ACCENT)),
        Span::raw("  "),
        Span::styled(spinner, Style::default().fg(TEXT_DIM)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
        .border_style(Style::default().fg(TEXT_DIM))
        .title("POKEDEX");
    let paragraph = Paragraph::new(header_text).block(block);
    frame.render_widget(paragraph, area);
}

fn render_body(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    event_ctx: &mut EventContext<DexComponentId>,
    list: &mut SelectList,
    evolution_list: &mut SelectList,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_list(frame, layout[0], state, event_ctx, list);
    render_detail(frame, layout[1], state, event_ctx, evolution_list);
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    event_ctx: &mut EventContext<DexComponentId>,
    list: &mut SelectList,
) {
    event_ctx.set_component_area(DexComponentId::List, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("DEX")
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
        .border_style(focus_border(state, FocusArea::List));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let items = list_items(state);
    if items.is_empty() {
        let content = if state.batch_loading || state.search_loading {
            "[loading]"
        } else {
            "[no entries]"
        };
        let paragraph = Paragraph::new(content)
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM));
        frame.render_widget(paragraph, inner);
        return;
    }
    let props = SelectListProps {
        items: &items,
        count: items.len(),
        selected: state.selected_index.min(items.len().saturating_sub(1)),
        is_focused: state.focus == FocusArea::List && !state.search.active,
        style: list_style(),
        behavior: SelectListBehavior {
            show_scrollbar: true,
            wrap_navigation: false,
        },
        on_select: Action::Select,
        render_item: &|item| item.clone(),
    };
    list.render(frame, inner, props);
}

fn render_detail(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    event_ctx: &mut EventContext<DexComponentId>,
    evolution_list: &mut SelectList,
) {
    event_ctx.set_component_area(DexComponentId::Detail, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("DATA")
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
        .border_style(focus_border(state, FocusArea::Detail));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(record) = state.current_record() else {
        let paragraph = Paragraph::new("[select a pokemon]")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM));
        frame.render_widget(paragraph, inner);
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(12),
            Constraint::Min(3),
            Constraint::Length(6),
        ])
        .split(inner);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[0]);

    render_sprite(frame, top[0], state, record);
    render_profile(frame, top[1], record);
    render_flavor(frame, layout[1], state, record);
    render_evolution(frame, layout[2], state, event_ctx, evolution_list);
}

fn render_sprite(frame: &mut Frame, area: Rect, state: &AppState, record: &PokemonRecord) {
    if let Some(sprite) = state.sprites.get(&record.id) {
        let (cols, rows) = sprite.fit(area.width, area.height);
        let text = sprite.to_text(cols, rows);
        let target = Rect {
            x: area.x + area.width.saturating_sub(cols) / 2,
            y: area.y + area.height.saturating_sub(rows) / 2,
            width: cols.min(area.width),
            height: rows.min(area.height),
        };
        frame.render_widget(Paragraph::new(text), target);
        return;
    }

    let content = if state.sprite_loading {
        "[loading sprite]"
    } else {
        "[no sprite]"
    };
    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_DIM));
    frame.render_widget(paragraph, area);
}

fn render_profile(frame: &mut Frame, area: Rect, record: &PokemonRecord) {
    let mut type_spans = vec![Span::raw("Type: ")];
    for (index, type_name) in record.types.iter().enumerate() {
        if index > 0 {
            type_spans.push(Span::raw(" "));
        }
        type_spans.push(Span::styled(
            format!(" {} ", type_name.to_ascii_uppercase()),
            Style::default()
                .bg(type_color(type_name))
                .fg(Color::Rgb(20, 20, 20))
                .add_modifier(Modifier::BOLD),
        ));
    }

    let text = Text::from(vec![
        Line::from(Span::styled(
            format_name(&record.name),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("#{:04}", record.id),
            Style::default().fg(ACCENT),
        )),
        Line::default(),
        Line::from(type_spans),
        Line::default(),
        Line::from(format!("Height: {:.1} m", record.height as f32 / 10.0)),
        Line::from(format!("Weight: {:.1} kg", record.weight as f32 / 10.0)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("PROFILE")
        .border_style(Style::default().fg(TEXT_DIM));
    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn render_flavor(frame: &mut Frame, area: Rect, state: &AppState, record: &PokemonRecord) {
    let content = record
        .flavor_text
        .as_deref()
        .unwrap_or("[no pokedex entry]");
    let block = Block::default()
        .borders(Borders::ALL)
        .title("ABOUT")
        .border_style(Style::default().fg(TEXT_DIM));
    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((state.flavor_scroll, 0))
        .style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, area);
}

fn render_evolution(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    event_ctx: &mut EventContext<DexComponentId>,
    evolution_list: &mut SelectList,
) {
    event_ctx.set_component_area(DexComponentId::Evolution, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("EVOLUTION")
        .border_style(focus_border(state, FocusArea::Evolution));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(stages) = state.current_evolution() else {
        let content = if state.evolution_loading {
            "[loading evolutions]"
        } else {
            "[no evolution data]"
        };
        let paragraph = Paragraph::new(content)
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM));
        frame.render_widget(paragraph, inner);
        return;
    };

    // A single stage means the species does not evolve at all.
    if stages.len() == 1 {
        let paragraph = Paragraph::new("This Pokémon does not evolve.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM));
        frame.render_widget(paragraph, inner);
        return;
    }

    let items = evolution_items(state);
    let props = SelectListProps {
        items: &items,
        count: items.len(),
        selected: state
            .evolution_selected_index
            .min(items.len().saturating_sub(1)),
        is_focused: state.focus == FocusArea::Evolution && !state.search.active,
        style: evolution_style(),
        behavior: SelectListBehavior {
            show_scrollbar: false,
            wrap_navigation: false,
        },
        on_select: Action::EvolutionSelect,
        render_item: &|item| item.clone(),
    };
    evolution_list.render(frame, inner, props);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState, status_bar: &mut StatusBar) {
    let status = state.message.clone().unwrap_or_else(|| {
        if state.catalog_loading {
            "Loading name list...".to_string()
        } else if state.search_loading {
            "Searching...".to_string()
        } else if state.batch_loading {
            "Loading pokemon...".to_string()
        } else if state.evolution_loading {
            "Loading evolutions...".to_string()
        } else {
            String::new()
        }
    });
    let left_hints = status_hints(state);
    let center_hints = [
        StatusBarHint::new("/", "Search"),
        StatusBarHint::new("r", "Random"),
        StatusBarHint::new("Tab", "Focus"),
        StatusBarHint::new("q", "Quit"),
    ];
    let status_span = Span::styled(status, Style::default().fg(ACCENT));
    let status_items = [StatusBarItem::span(status_span)];

    let style = StatusBarStyle {
        base: BaseStyle {
            border: Some(BorderStyle {
                borders: Borders::ALL,
                style: Style::default().fg(TEXT_DIM),
                focused_style: None,
            }),
            padding: Padding::xy(1, 0),
            bg: Some(BG_PANEL),
            fg: Some(TEXT_MAIN),
        },
        text: Style::default().fg(TEXT_DIM),
        hint_key: Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        hint_label: Style::default().fg(TEXT_DIM),
        separator: Style::default().fg(TEXT_DIM),
    };

    let props = StatusBarProps {
        left: StatusBarSection::hints(&left_hints).with_separator("  "),
        center: StatusBarSection::hints(&center_hints).with_separator("  "),
        right: StatusBarSection::items(&status_items).with_separator("  "),
        style,
        is_focused: false,
    };
    Component::<Action>::render(status_bar, frame, area, props);
}

fn status_hints(state: &AppState) -> Vec<StatusBarHint<'static>> {
    if state.search.active {
        return vec![
            StatusBarHint::new("Enter", "Search"),
            StatusBarHint::new("Esc", "Cancel"),
        ];
    }
    match state.focus {
        FocusArea::List => {
            let mut hints = vec![
                StatusBarHint::new("Up/Down", "Move"),
                StatusBarHint::new("PgUp/PgDn", "Page"),
                StatusBarHint::new("m", "More"),
            ];
            if state.search_results.is_some() {
                hints.push(StatusBarHint::new("Esc", "Back"));
            }
            hints
        }
        FocusArea::Detail => vec![StatusBarHint::new("Up/Down", "Scroll")],
        FocusArea::Evolution => vec![
            StatusBarHint::new("Up/Down", "Select"),
            StatusBarHint::new("Enter", "Jump"),
        ],
    }
}

fn list_items(state: &AppState) -> Vec<Line<'static>> {
    state
        .visible_records()
        .iter()
        .map(|record| {
            let mut spans = vec![
                Span::styled(
                    format!("#{:04} ", record.id),
                    Style::default().fg(TEXT_DIM),
                ),
                Span::raw(format!("{:<12} ", record.name)),
            ];
            for (index, type_name) in record.types.iter().enumerate() {
                if index > 0 {
                    spans.push(Span::raw("/"));
                }
                spans.push(Span::styled(
                    type_name.clone(),
                    Style::default().fg(type_color(type_name)),
                ));
            }
            Line::from(spans)
        })
        .collect()
}

fn evolution_items(state: &AppState) -> Vec<Line<'static>> {
    let Some(stages) = state.current_evolution() else {
        return Vec::new();
    };
    let current_id = state.current_record().map(|record| record.id.to_string());
    stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let marker = if current_id.as_deref() == Some(stage.id.as_str()) {
                "*"
            } else {
                " "
            };
            Line::from(format!(
                "{marker} {:02} {} (#{})",
                index + 1,
                format_name(&stage.name),
                stage.id
            ))
        })
        .collect()
}

fn list_style() -> SelectListStyle {
    SelectListStyle {
        base: BaseStyle {
            border: None,
            padding: Padding::xy(1, 0),
            bg: None,
            fg: Some(TEXT_MAIN),
        },
        selection: SelectionStyle {
            style: Some(
                Style::default()
                    .bg(BG_HIGHLIGHT)
                    .fg(TEXT_MAIN)
                    .add_modifier(Modifier::BOLD),
            ),
            marker: None,
            disabled: false,
        },
        ..SelectListStyle::default()
    }
}

fn evolution_style() -> SelectListStyle {
    SelectListStyle {
        base: BaseStyle {
            border: None,
            padding: Padding::xy(1, 0),
            bg: Some(BG_PANEL),
            fg: Some(TEXT_MAIN),
        },
        selection: SelectionStyle {
            style: Some(
                Style::default()
                    .bg(BG_HIGHLIGHT)
                    .fg(TEXT_MAIN)
                    .add_modifier(Modifier::BOLD),
            ),
            marker: None,
            disabled: false,
        },
        ..SelectListStyle::default()
    }
}

fn focus_border(state: &AppState, area: FocusArea) -> Style {
    if state.focus == area && !state.search.active {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_DIM)
    }
}

/// "mr-mime" -> "Mr Mime", as the original detail screen shows names.
pub fn format_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical type plate colors from the original app.
pub fn type_color(type_name: &str) -> Color {
    match type_name {
        "normal" => Color::Rgb(0xA8, 0xA8, 0x78),
        "fighting" => Color::Rgb(0xC0, 0x30, 0x28),
        "flying" => Color::Rgb(0xA8, 0x90, 0xF0),
        "poison" => Color::Rgb(0xA0, 0x40, 0xA0),
        "ground" => Color::Rgb(0xE0, 0xC0, 0x68),
        "rock" => Color::Rgb(0xB8, 0xA0, 0x38),
        "bug" => Color::Rgb(0xA8, 0xB8, 0x20),
        "ghost" => Color::Rgb(0x70, 0x58, 0x98),
        "steel" => Color::Rgb(0xB8, 0xB8, 0xD0),
        "fire" => Color::Rgb(0xF0, 0x80, 0x30),
        "water" => Color::Rgb(0x68, 0x90, 0xF0),
        "grass" => Color::Rgb(0x78, 0xC8, 0x50),
        "electric" => Color::Rgb(0xF8, 0xD0, 0x30),
        "psychic" => Color::Rgb(0xF8, 0x58, 0x88),
        "ice" => Color::Rgb(0x98, 0xD8, 0xD8),
        "dragon" => Color::Rgb(0x70, 0x38, 0xF8),
        "dark" => Color::Rgb(0x70, 0x58, 0x48),
        "fairy" => Color::Rgb(0xEE, 0x99, 0xAC),
        _ => Color::Rgb(0xAA, 0xAA, 0xAA),
    }
}
