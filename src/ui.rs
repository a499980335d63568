use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Terminal,
};

use crate::error::Error;
use crate::sampler::{SampleObserver, Sampler, SamplerState, Series};
use crate::source::CounterSource;
use crate::util::{format_kb, kb_to_gib};

// Layer colors, bottom of the stack first.
const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Red,
    Color::Blue,
];

#[derive(Default)]
struct UiStats {
    ticks: u64,
    errors: u64,
    last_error: Option<String>,
}

impl SampleObserver for UiStats {
    fn on_sample(&mut self, _series: &[Series]) {
        self.ticks += 1;
    }

    fn on_error(&mut self, tick_index: u64, error: &Error) {
        self.errors += 1;
        self.last_error = Some(format!("tick {}: {}", tick_index, error));
    }
}

pub fn run<S: CounterSource>(
    sampler: Sampler<S>,
    source_label: &str,
    stop: Arc<AtomicBool>,
) -> io::Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, sampler, source_label, stop);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err)
    }
    Ok(())
}

fn run_app_loop<B: ratatui::backend::Backend, S: CounterSource>(
    terminal: &mut Terminal<B>,
    mut sampler: Sampler<S>,
    source_label: &str,
    stop: Arc<AtomicBool>,
) -> io::Result<()> {
    let tick_rate = sampler.interval();
    let started_at = Local::now();
    let mut stats = UiStats::default();
    let mut last_tick = Instant::now();

    sampler.start();
    // First sample immediately so the chart is not empty for a full interval.
    tick_or_fail(&mut sampler, &mut stats)?;

    loop {
        terminal.draw(|f| {
            let main_chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(0)
                .constraints([
                    Constraint::Min(10),   // Chart Box
                    Constraint::Length(1), // Bottom Status Bar
                ])
                .split(f.size());

            let chart_block = Block::default()
                .borders(Borders::ALL)
                .title(format!(" Memory [{}] ", source_label))
                .border_type(ratatui::widgets::BorderType::Rounded)
                .border_style(Style::default().fg(Color::Cyan));
            f.render_widget(chart_block.clone(), main_chunks[0]);

            let inner_area = chart_block.inner(main_chunks[0]);
            let graph_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
                .split(inner_area);

            render_stacked_chart(f, graph_chunks[0], sampler.series());
            render_legend(f, graph_chunks[1], sampler.series());

            // ============ Bottom Status Bar ============
            let mut status_spans = vec![
                Span::styled(
                    format!(" since {} ", started_at.format("%H:%M:%S")),
                    Style::default().bg(Color::White).fg(Color::Black),
                ),
                Span::raw(format!(
                    " | samples: {} | skipped: {}",
                    stats.ticks, stats.errors
                )),
            ];
            if let Some(err) = &stats.last_error {
                status_spans.push(Span::styled(
                    format!(" | {}", err),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            }
            status_spans.push(Span::raw(" | Press 'q' to quit"));
            let status_bar = Paragraph::new(Line::from(status_spans))
                .style(Style::default().bg(Color::Rgb(20, 20, 20)));
            f.render_widget(status_bar, main_chunks[1]);
        })?;

        // Handle input
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') || key.code == KeyCode::Char('c') {
                    sampler.stop();
                    return Ok(());
                }
            }
        }
        if stop.load(Ordering::SeqCst) {
            sampler.stop();
            return Ok(());
        }
        if sampler.state() == SamplerState::Stopped {
            // Tick count reached.
            return Ok(());
        }
        if last_tick.elapsed() >= tick_rate {
            tick_or_fail(&mut sampler, &mut stats)?;
            last_tick = Instant::now();
        }
    }
}

// Under the abort policy a failed read stops the session; anything else is
// absorbed by the observer.
fn tick_or_fail<S: CounterSource>(
    sampler: &mut Sampler<S>,
    stats: &mut UiStats,
) -> io::Result<()> {
    sampler
        .tick(stats)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

fn render_stacked_chart(
    f: &mut ratatui::Frame,
    area: ratatui::layout::Rect,
    series: &[Series],
) {
    let len = series.first().map_or(0, |s| s.points.len());
    if len == 0 {
        let placeholder = Paragraph::new("waiting for first sample...")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(placeholder, area);
        return;
    }

    let x_min = series[0].points.front().map_or(0.0, |&(ts, _)| ts);
    let x_max = series[0].points.back().map_or(1.0, |&(ts, _)| ts);
    let x_max = if x_max > x_min { x_max } else { x_min + 1.0 };

    // Y axis is the stacked total, in GiB.
    let mut max_total: f64 = 0.0;
    for idx in 0..len {
        let total: f64 = series.iter().map(|s| kb_to_gib(s.points[idx].1)).sum();
        max_total = max_total.max(total);
    }
    let y_max = if max_total > 0.0 { max_total * 1.05 } else { 1.0 };

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(
                    " {:.0}s..{:.0}s / 0..{:.2} GiB ",
                    x_min, x_max, y_max
                ))
                .title_style(Style::default().fg(Color::DarkGray)),
        )
        .marker(Marker::Braille)
        .x_bounds([x_min, x_max])
        .y_bounds([0.0, y_max])
        .paint(|ctx| {
            for idx in 0..len {
                let x = series[0].points[idx].0;
                let mut base = 0.0;
                for (layer, s) in series.iter().enumerate() {
                    let top = base + kb_to_gib(s.points[idx].1);
                    ctx.draw(&CanvasLine {
                        x1: x,
                        y1: base,
                        x2: x,
                        y2: top,
                        color: PALETTE[layer % PALETTE.len()],
                    });
                    base = top;
                }
            }
        });
    f.render_widget(canvas, area);
}

// Legend order matches stacking order, bottom layer first.
fn render_legend(f: &mut ratatui::Frame, area: ratatui::layout::Rect, series: &[Series]) {
    let mut lines = Vec::new();
    let mut total = 0i64;
    for (layer, s) in series.iter().enumerate() {
        let value = s.latest().map(|(_, v)| v);
        total += value.unwrap_or(0);
        lines.push(Line::from(vec![
            Span::styled(
                "■ ",
                Style::default().fg(PALETTE[layer % PALETTE.len()]),
            ),
            Span::raw(format!("{:<18}", s.name)),
            Span::styled(
                value.map_or("-".to_string(), format_kb),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("  Total:           ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_kb(total)),
    ]));
    f.render_widget(Paragraph::new(lines), area);
}
