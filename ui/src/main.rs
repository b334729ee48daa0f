use std::{cell::RefCell, io::Result, rc::Rc};

use crmhub_model::{Alert, DisplayedData, Provider, RecordViewer, COLUMNS};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use ratzilla::event::KeyCode;
use ratzilla::ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Terminal,
};
use ratzilla::{DomBackend, WebRenderer};
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, FormData, UrlSearchParams};

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const POPUP_POLL_MS: u32 = 500;

// ─── App State ──────────────────────────────────────────────────────────────

struct AppState {
    viewer: RecordViewer,
    api_base: String,
    user_id: String,
    org_id: String,
    table_state: TableState,
    /// One-line feedback shown under the table
    status: String,
    busy: bool,
}

impl AppState {
    fn new() -> Self {
        let params = page_params();
        let param = |name: &str, default: &str| {
            params
                .as_ref()
                .and_then(|p| p.get(name))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            viewer: RecordViewer::new(Provider::HubSpot),
            api_base: param("api", DEFAULT_API_BASE).trim_end_matches('/').to_string(),
            user_id: param("user_id", "TestUser"),
            org_id: param("org_id", "TestOrg"),
            table_state: TableState::default(),
            status: "Press c to connect".to_string(),
            busy: false,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn integration_url(&self, provider: Provider, action: &str) -> String {
        self.url(&format!("/integrations/{}/{}", provider, action))
    }

    fn reset_selection(&mut self) {
        let selected = match self.viewer.displayed() {
            DisplayedData::Table(rows) if !rows.is_empty() => Some(0),
            _ => None,
        };
        self.table_state.select(selected);
    }

    fn move_selection(&mut self, delta: isize) {
        let DisplayedData::Table(rows) = self.viewer.displayed() else {
            return;
        };
        if rows.is_empty() {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, rows.len() as isize - 1);
        self.table_state.select(Some(next as usize));
    }
}

// ─── Browser helpers ────────────────────────────────────────────────────────

fn page_params() -> Option<UrlSearchParams> {
    let search = window()?.location().search().ok()?;
    UrlSearchParams::new_with_str(&search).ok()
}

/// Blocking browser alert.
fn show_alert(alert: &Alert) {
    if let Some(win) = window() {
        if win.alert_with_message(&alert.message).is_err() {
            web_sys::console::log_1(&format!("Alert: {}", alert).into());
        }
    }
}

fn form(fields: &[(&str, &str)]) -> std::result::Result<FormData, Alert> {
    let data = FormData::new().map_err(|e| Alert::new(format!("{:?}", e)))?;
    for (name, value) in fields {
        data.append_with_str(name, value)
            .map_err(|e| Alert::new(format!("{:?}", e)))?;
    }
    Ok(data)
}

/// POST a form; returns status and body text.
async fn post_form(url: &str, data: FormData) -> std::result::Result<(u16, String), Alert> {
    let response = Request::post(url)
        .body(data)
        .map_err(|e| Alert::new(e.to_string()))?
        .send()
        .await
        .map_err(|e| Alert::new(format!("Request to {} failed: {}", url, e)))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Alert::new(e.to_string()))?;
    Ok((status, body))
}

/// Expect a 2xx; otherwise turn the error body into an alert.
async fn post_form_ok(url: &str, data: FormData) -> std::result::Result<String, Alert> {
    let (status, body) = post_form(url, data).await?;
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(Alert::from_error_response(status, &body))
    }
}

// ─── Actions ────────────────────────────────────────────────────────────────

/// authorize → popup → wait for it to close → fetch the stored token blob.
fn connect(state: Rc<RefCell<AppState>>) {
    let (provider, authorize_url, credentials_url, user_id, org_id) = {
        let mut s = state.borrow_mut();
        if s.busy {
            return;
        }
        s.busy = true;
        let provider = s.viewer.provider();
        s.status = format!("Connecting to {}...", provider.display_name());
        (
            provider,
            s.integration_url(provider, "authorize"),
            s.integration_url(provider, "credentials"),
            s.user_id.clone(),
            s.org_id.clone(),
        )
    };

    spawn_local(async move {
        let result = async {
            let identity = [("user_id", user_id.as_str()), ("org_id", org_id.as_str())];
            let body = post_form_ok(&authorize_url, form(&identity)?).await?;
            let auth_url: String = serde_json::from_str(&body)
                .map_err(|_| Alert::new("Unexpected authorize response"))?;

            let popup = window()
                .and_then(|w| {
                    w.open_with_url_and_target_and_features(
                        &auth_url,
                        "crmhub-oauth",
                        "width=600,height=600",
                    )
                    .ok()
                })
                .flatten()
                .ok_or_else(|| Alert::new("Could not open the authorization window"))?;

            while !popup.closed().unwrap_or(true) {
                TimeoutFuture::new(POPUP_POLL_MS).await;
            }

            post_form_ok(&credentials_url, form(&identity)?).await
        }
        .await;

        let mut s = state.borrow_mut();
        s.busy = false;
        // The user may have switched provider while the popup was open
        if s.viewer.provider() != provider {
            return;
        }
        match result {
            Ok(credentials) => {
                s.viewer.set_credentials(credentials);
                s.status = format!("{} connected. Press l to load", provider.display_name());
            }
            Err(alert) => {
                s.status = format!("{} connection failed", provider.display_name());
                drop(s);
                show_alert(&alert);
            }
        }
    });
}

/// One request per Load; whichever response arrives last is what shows.
fn load(state: Rc<RefCell<AppState>>) {
    let (provider, url, credentials) = {
        let mut s = state.borrow_mut();
        let Some(request) = s.viewer.load_request() else {
            s.status = "Not connected. Press c to connect first".to_string();
            return;
        };
        s.status = "Loading...".to_string();
        (s.viewer.provider(), s.url(&request.path), request.credentials)
    };

    spawn_local(async move {
        let result = match form(&[("credentials", credentials.as_str())]) {
            Ok(data) => post_form(&url, data).await,
            Err(alert) => Err(alert),
        };

        let mut s = state.borrow_mut();
        if s.viewer.provider() != provider {
            return;
        }
        let outcome = result.and_then(|(status, body)| s.viewer.apply_response(status, &body));
        match outcome {
            Ok(()) => {
                s.reset_selection();
                s.status = match s.viewer.displayed() {
                    DisplayedData::Table(rows) => format!("{} records", rows.len()),
                    _ => "Response is not a list".to_string(),
                };
            }
            Err(alert) => {
                s.status = "Load failed".to_string();
                drop(s);
                show_alert(&alert);
            }
        }
    });
}

// ─── UI Rendering ───────────────────────────────────────────────────────────

fn render_header(f: &mut ratzilla::ratatui::Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(40)])
        .split(area);

    let mut tabs = vec![
        Span::styled("crmhub", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
        Span::styled("  ", Style::default()),
    ];
    for provider in Provider::ALL {
        let style = if provider == state.viewer.provider() {
            Style::default().fg(Color::Black).bg(Color::Magenta).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tabs.push(Span::styled(format!(" {} ", provider.display_name()), style));
    }
    let title = Paragraph::new(Line::from(tabs))
        .block(Block::default().borders(Borders::BOTTOM).border_style(Color::DarkGray));

    let status_text = if state.viewer.is_connected() {
        Span::styled("● CONNECTED", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("● NOT CONNECTED", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{}@{}  ", state.user_id, state.org_id),
            Style::default().fg(Color::DarkGray),
        ),
        status_text,
    ]))
    .alignment(ratzilla::ratatui::layout::Alignment::Right)
    .block(Block::default().borders(Borders::BOTTOM).border_style(Color::DarkGray));

    f.render_widget(title, chunks[0]);
    f.render_widget(status, chunks[1]);
}

fn render_records(f: &mut ratzilla::ratatui::Frame, area: Rect, state: &mut AppState) {
    let block = |title: String| {
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
    };

    match state.viewer.displayed() {
        DisplayedData::Empty => {
            let empty = Paragraph::new(Span::styled(
                "No data loaded",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block(" Records ".to_string()));
            f.render_widget(empty, area);
        }
        DisplayedData::Raw(text) => {
            let raw = Paragraph::new(text.as_str())
                .style(Style::default().fg(Color::White))
                .block(block(" Response ".to_string()))
                .wrap(Wrap { trim: false });
            f.render_widget(raw, area);
        }
        DisplayedData::Table(rows) => {
            let header = Row::new(COLUMNS.iter().map(|c| {
                Cell::from(Span::styled(
                    *c,
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ))
            }))
            .style(Style::default().bg(Color::DarkGray));

            let count = rows.len();
            let body: Vec<Row> = rows
                .iter()
                .map(|row| {
                    Row::new(row.cells.iter().enumerate().map(|(i, cell)| {
                        let color = match i {
                            0 => Color::Cyan,
                            2 => Color::White,
                            _ => Color::Gray,
                        };
                        Cell::from(Span::styled(cell.clone(), Style::default().fg(color)))
                    }))
                })
                .collect();

            let table = Table::new(
                body,
                [
                    Constraint::Min(14),
                    Constraint::Length(9),
                    Constraint::Min(24),
                    Constraint::Min(18),
                    Constraint::Min(14),
                    Constraint::Length(10),
                    Constraint::Length(19),
                    Constraint::Length(19),
                ],
            )
            .header(header)
            .block(block(format!(" Records ({}) ", count)))
            .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

            f.render_stateful_widget(table, area, &mut state.table_state);
        }
    }
}

fn render_status(f: &mut ratzilla::ratatui::Frame, area: Rect, state: &AppState) {
    let status = Paragraph::new(Line::from(Span::styled(
        format!(" {}", state.status),
        Style::default().fg(Color::Yellow),
    )))
    .block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, area);
}

fn render_help(f: &mut ratzilla::ratatui::Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let text = |t: &'static str| Span::styled(t, Style::default().fg(Color::DarkGray));
    let help = Paragraph::new(Line::from(vec![
        key(" Tab"),
        text(" integration  "),
        key("c"),
        text(" connect  "),
        key("l"),
        text(" load  "),
        key("x"),
        text(" clear  "),
        key("↑↓"),
        text(" navigate"),
    ]));
    f.render_widget(help, area);
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let state = Rc::new(RefCell::new(AppState::new()));

    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;

    // ── Key events ──────────────────────────────────────────────────────
    terminal.on_key_event({
        let state_clone = state.clone();
        move |key_event| match key_event.code {
            KeyCode::Tab => {
                let mut s = state_clone.borrow_mut();
                let next = s.viewer.provider().next();
                s.viewer.select_provider(next);
                s.reset_selection();
                s.status = format!("{} selected. Press c to connect", next.display_name());
            }
            KeyCode::Char('c') => connect(state_clone.clone()),
            KeyCode::Char('l') => load(state_clone.clone()),
            KeyCode::Char('x') => {
                let mut s = state_clone.borrow_mut();
                s.viewer.clear();
                s.reset_selection();
                s.status = "Cleared".to_string();
            }
            KeyCode::Up | KeyCode::Char('k') => state_clone.borrow_mut().move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => state_clone.borrow_mut().move_selection(1),
            _ => {}
        }
    });

    // ── Draw loop (runs on rAF) ─────────────────────────────────────────
    terminal.draw_web({
        let state_clone = state.clone();
        move |f| {
            let s = &mut *state_clone.borrow_mut();

            let outer = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(2), // header
                    Constraint::Min(10),   // records
                    Constraint::Length(2), // status
                    Constraint::Length(1), // help
                ])
                .split(f.area());

            render_header(f, outer[0], s);
            render_records(f, outer[1], s);
            render_status(f, outer[2], s);
            render_help(f, outer[3]);
        }
    });

    Ok(())
}
