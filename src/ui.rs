use color_eyre::eyre::Result;
use crossterm::event::{
    Event,
    EventStream,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use fruit_gacha::{
    ClickAction,
    EngineSnapshot,
    GachaEngine,
    SaveStore,
    roll::clamp_roll_count,
};
use futures::StreamExt;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::{
    io::stdout,
    pin::pin,
    time::Duration,
};
use tokio::time;

pub enum UserEvent {
    Quit,
    Click,
    ToggleDebug,
    SetCount(u32),
    SelectPrev,
    SelectNext,
    DecrementSelected,
    RemoveSelected,
    ConfirmReset,
    Redraw,
}

pub struct UiState {
    mode: Mode,
    roll_count: u32,
    selected: usize,
    status: String,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl UiState {
    fn new(roll_count: u32) -> Self {
        UiState {
            mode: Mode::Normal,
            roll_count: clamp_roll_count(roll_count),
            selected: 0,
            status: String::from("Ready"),
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    CountModal(CountState),
    ResetModal,
    QuitModal,
}

#[derive(Clone, Debug, Default)]
struct CountState {
    value: u32,
}

fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub async fn run_app<S: SaveStore + Clone>(
    mut engine: GachaEngine<S>,
    initial_count: u32,
) -> Result<()> {
    let mut state = UiState::new(initial_count);
    terminal_enter(&mut state)?;
    let res = run_loop(&mut engine, &mut state).await;
    terminal_exit()?;
    res
}

async fn run_loop<S: SaveStore + Clone>(
    engine: &mut GachaEngine<S>,
    state: &mut UiState,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut debug_events = engine.subscribe_debug();
    let mut ticker = time::interval(Duration::from_millis(500));
    draw(state, &engine.snapshot())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                draw(state, &engine.snapshot())?;
            }
            observed = debug_events.next() => {
                if let Some(on) = observed {
                    engine.sync_debug_flag(on);
                    draw(state, &engine.snapshot())?;
                }
            }
            ev = next_event(state, &mut events) => {
                match ev? {
                    UserEvent::Quit => break,
                    UserEvent::Click => handle_click(engine, state, &mut events).await?,
                    UserEvent::ToggleDebug => {
                        let on = !engine.debug_flag();
                        engine.set_debug_flag(on)?;
                        state.status = format!("Debug {}", if on { "on" } else { "off" });
                    }
                    UserEvent::SetCount(n) => {
                        state.roll_count = clamp_roll_count(n);
                        state.status = format!("Roll count set to {}", state.roll_count);
                    }
                    UserEvent::SelectPrev => {
                        state.selected = state.selected.saturating_sub(1);
                    }
                    UserEvent::SelectNext => {
                        let rows = engine.snapshot().rows.len();
                        state.selected = (state.selected + 1).min(rows.saturating_sub(1));
                    }
                    UserEvent::DecrementSelected => {
                        if let Some(name) = selected_name(state, engine) {
                            engine.adjust_inventory(&name, -1)?;
                        }
                    }
                    UserEvent::RemoveSelected => {
                        if let Some(name) = selected_name(state, engine) {
                            engine.remove_from_inventory(&name)?;
                            state.status = format!("Removed {name}");
                        }
                    }
                    UserEvent::ConfirmReset => {
                        engine.reset_all()?;
                        state.selected = 0;
                        state.status = String::from("Inventory and stats cleared");
                    }
                    UserEvent::Redraw => {}
                }
                draw(state, &engine.snapshot())?;
            }
        }
    }
    Ok(())
}

fn selected_name<S: SaveStore + Clone>(
    state: &UiState,
    engine: &GachaEngine<S>,
) -> Option<String> {
    let snapshot = engine.snapshot();
    snapshot.rows.get(state.selected).map(|row| row.name.clone())
}

async fn handle_click<S: SaveStore + Clone>(
    engine: &mut GachaEngine<S>,
    state: &mut UiState,
    events: &mut EventStream,
) -> Result<()> {
    match engine.handle_click() {
        ClickAction::StartRequested => animate_roll(engine, state, events).await,
        ClickAction::Dismissed => {
            state.status = String::from("Ready");
            Ok(())
        }
        ClickAction::Ignored | ClickAction::Disabled => Ok(()),
    }
}

/// Drive one roll to completion, redrawing on every preview frame. A click
/// while the animation runs only cuts the wait short; the draws are still
/// committed afterwards.
async fn animate_roll<S: SaveStore + Clone>(
    engine: &mut GachaEngine<S>,
    state: &mut UiState,
    events: &mut EventStream,
) -> Result<()> {
    let mut preview_rx = engine.preview_watch();
    let skip = engine.skip_handle();
    let base = engine.snapshot();
    let count = state.roll_count;
    let mut roll = pin!(engine.run_roll(count));
    let outcome = loop {
        tokio::select! {
            res = &mut roll => break res?,
            changed = preview_rx.changed() => {
                if changed.is_ok() {
                    let mut frame = base.clone();
                    frame.rolling = true;
                    frame.preview = preview_rx.borrow_and_update().clone();
                    draw(state, &frame)?;
                }
            }
            maybe = events.next() => {
                if let Some(Ok(Event::Key(k))) = maybe {
                    let clicked = k.kind == KeyEventKind::Press
                        && matches!(k.code, KeyCode::Char('r') | KeyCode::Char(' '));
                    if clicked {
                        skip.skip();
                    }
                }
            }
        }
    };
    state.status = if outcome.total > 1 {
        format!("{} +{} more", outcome.first.name, outcome.total - 1)
    } else {
        format!("You got {}", outcome.first.name)
    };
    Ok(())
}

pub async fn next_event(state: &mut UiState, events: &mut EventStream) -> Result<UserEvent> {
    loop {
        let Some(event) = events.next().await else { continue };
        if let Event::Key(k) = event? {
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match &mut state.mode {
                Mode::CountModal(cs) => {
                    match k.code {
                        KeyCode::Esc => { state.mode = Mode::Normal; return Ok(UserEvent::Redraw); }
                        KeyCode::Enter => { let n = cs.value.max(1); state.mode = Mode::Normal; return Ok(UserEvent::SetCount(n)); }
                        KeyCode::Backspace => { cs.value /= 10; return Ok(UserEvent::Redraw); }
                        KeyCode::Char(c) if c.is_ascii_digit() => {
                            let d = c.to_digit(10).unwrap();
                            cs.value = cs.value.saturating_mul(10).saturating_add(d);
                            return Ok(UserEvent::Redraw);
                        }
                        _ => {}
                    }
                }
                Mode::ResetModal => {
                    match k.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => { state.mode = Mode::Normal; return Ok(UserEvent::ConfirmReset); }
                        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => { state.mode = Mode::Normal; return Ok(UserEvent::Redraw); }
                        _ => {}
                    }
                }
                Mode::QuitModal => {
                    match k.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => { return Ok(UserEvent::Quit); }
                        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => { state.mode = Mode::Normal; return Ok(UserEvent::Redraw); }
                        _ => {}
                    }
                }
                Mode::Normal => {
                    return Ok(match k.code {
                        KeyCode::Char('q') | KeyCode::Esc => { state.mode = Mode::QuitModal; UserEvent::Redraw }
                        KeyCode::Char('r') | KeyCode::Char(' ') => UserEvent::Click,
                        KeyCode::Char('d') => UserEvent::ToggleDebug,
                        KeyCode::Char('c') => { state.mode = Mode::CountModal(CountState::default()); UserEvent::Redraw }
                        KeyCode::Char('1') => UserEvent::SetCount(1),
                        KeyCode::Char('2') => UserEvent::SetCount(10),
                        KeyCode::Char('3') => UserEvent::SetCount(100),
                        KeyCode::Char('R') => { state.mode = Mode::ResetModal; UserEvent::Redraw }
                        KeyCode::Up => UserEvent::SelectPrev,
                        KeyCode::Down => UserEvent::SelectNext,
                        KeyCode::Char('-') => UserEvent::DecrementSelected,
                        KeyCode::Char('x') => UserEvent::RemoveSelected,
                        _ => continue,
                    });
                }
            }
        }
    }
}

fn draw(state: &mut UiState, snap: &EngineSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, snap: &EngineSnapshot) {
    f.render_widget(Clear, f.area());
    let debug_height = if snap.debug { 9 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // status
            Constraint::Length(6),            // roll button
            Constraint::Min(8),               // inventory
            Constraint::Length(debug_height), // debug pane
            Constraint::Length(3),            // help
        ])
        .split(f.area());

    draw_status(f, chunks[0], state, snap);
    draw_roll(f, chunks[1], state, snap);
    draw_inventory(f, chunks[2], state, snap);
    if snap.debug {
        draw_debug(f, chunks[3], state, snap);
    }
    draw_help(f, chunks[4]);
    draw_modals(f, state);
}

fn draw_status(f: &mut Frame, area: Rect, state: &UiState, snap: &EngineSnapshot) {
    let source = if snap.degraded { "fallback" } else { "live" };
    let status = Paragraph::new(format!(
        "Total Rolls: {} | Inventory Items: {} | Pool: {} ({}) | {}",
        snap.total_rolls, snap.total_items, snap.pool_len, source, state.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Gacha Simulator"));
    f.render_widget(status, area);
}

fn draw_roll(f: &mut Frame, area: Rect, state: &UiState, snap: &EngineSnapshot) {
    let mut lines = Vec::new();
    if snap.rolling {
        let preview = snap
            .preview
            .as_ref()
            .map(|item| item.name.as_str())
            .unwrap_or("...");
        lines.push(Line::styled(
            "Rolling...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(format!("  {preview}")));
        lines.push(Line::from("Good luck!"));
    } else if let Some(outcome) = &snap.settled {
        lines.push(Line::styled(
            outcome.first.name.clone(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(format!("  {}", outcome.first.rarity)));
        lines.push(Line::from(if outcome.total > 1 {
            format!("+{} more | press r to dismiss", outcome.total - 1)
        } else {
            String::from("press r to dismiss")
        }));
    } else if snap.pool_len == 0 {
        lines.push(Line::styled(
            "Pool unavailable",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        lines.push(Line::styled(
            "ROLL",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(format!("x{}", state.roll_count)));
    }
    let roll = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Roll"));
    f.render_widget(roll, area);
}

fn draw_inventory(f: &mut Frame, area: Rect, state: &UiState, snap: &EngineSnapshot) {
    let mut lines = Vec::new();
    if snap.rows.is_empty() {
        lines.push(Line::styled(
            "No items yet. Roll to fill your inventory.",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        for (i, row) in snap.rows.iter().enumerate() {
            let cursor = if i == state.selected { ">" } else { " " };
            let rarity = row.rarity.map(|r| r.label()).unwrap_or("-");
            lines.push(Line::from(format!(
                "{} {:<16} x{:<6} {}",
                cursor, row.name, row.count, rarity
            )));
        }
    }
    let inventory = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Your Inventory"));
    f.render_widget(inventory, area);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &UiState, snap: &EngineSnapshot) {
    let mut lines = vec![Line::from(format!(
        "Pool size: {} | Roll count: {}",
        snap.pool_len, state.roll_count
    ))];
    lines.push(Line::from("Rarity odds:"));
    for (rarity, weight) in &snap.weights {
        lines.push(Line::from(format!("  {rarity}: {weight} weight")));
    }
    lines.push(Line::from("Rolls by rarity:"));
    let counts: Vec<String> = snap
        .by_rarity
        .iter()
        .map(|(rarity, n)| format!("{rarity} {n}"))
        .collect();
    lines.push(Line::from(format!("  {}", counts.join(" | "))));
    let debug = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Debug"));
    f.render_widget(debug, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "r/space roll | up/down select | - decrement | x remove | c count | 1/2/3 x1/x10/x100 | d debug | R reset | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::CountModal(cs) => {
            let area = centered_rect(40, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Roll Count");
            let p = Paragraph::new(format!(
                "Count: {}\nEnter=confirm Esc=cancel, digits to edit",
                cs.value
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::ResetModal => {
            let area = centered_rect(50, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Reset");
            let p = Paragraph::new("Clear all gacha inventory and stats? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the simulator? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
