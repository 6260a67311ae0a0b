use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

use crate::cli::input::LineEdit;
use crate::cli::state::{App, DashTab, ExpenseForm, PaymentForm, Screen};
use crate::cli::util::{describe_period, fmt_money};
use crate::database::models::RecordStatus;

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.size();

    // top tabs | main content | bottom status bar
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
        .split(size);

    let titles = ["Lookup (F2)", "Invoice (F3)", "Admin (F4)", "Help (F1)"]
        .into_iter()
        .map(|t| Line::from(Span::raw(t)))
        .collect::<Vec<_>>();
    let selected = match app.screen {
        Screen::Lookup => 0,
        Screen::Invoice => 1,
        Screen::Login | Screen::Dashboard => 2,
        Screen::Help => 3,
    };
    let title = match app.auth.session() {
        Some(s) => format!("Jasmin D Billing  [{}]", s.email),
        None => "Jasmin D Billing".to_string(),
    };
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(tabs, root[0]);

    match app.screen {
        Screen::Lookup => draw_lookup(f, root[1], app),
        Screen::Invoice => draw_invoice(f, root[1], app),
        Screen::Login => draw_login(f, root[1], app),
        Screen::Dashboard => draw_dashboard(f, root[1], app),
        Screen::Help => draw_help(f, root[1]),
    }

    let status = Paragraph::new(app.status.as_str())
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, root[2]);
}

fn field_line(label: &str, edit: &LineEdit, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let mut shown = edit.rendered();
    if focused {
        shown.push('_');
    }
    Line::from(vec![
        Span::raw(format!("{label:<11}: ")),
        Span::styled(shown, style),
    ])
}

fn choice_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label:<11}: ")),
        Span::styled(format!("< {value} >"), style),
    ])
}

fn status_style(status: RecordStatus) -> Style {
    match status {
        RecordStatus::Paid => Style::default().fg(Color::Green),
        RecordStatus::Unpaid => Style::default().fg(Color::Red),
    }
}

// Public lookup

fn draw_lookup(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let page = &mut app.lookup;
    let input = Paragraph::new(field_line("Apartment", &page.apartment, !page.list_focus)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Find your payments  (Enter=search, Tab=results)"),
    );
    f.render_widget(input, rows[0]);

    let header = Row::new(vec!["Month", "Amount", "Date", "Status"]).height(1);
    let body: Vec<Row> = page
        .results
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(describe_period(&p.description)),
                Cell::from(fmt_money(&p.amount)),
                Cell::from(p.date.to_string()),
                Cell::from(p.status.label()).style(status_style(p.status)),
            ])
        })
        .collect();

    let title = match &page.searched_for {
        Some(a) if page.results.is_empty() => format!("No payments for apartment {a}"),
        Some(a) => format!("Apartment {a}  (Up/Down, d=download invoice)"),
        None => "Results".to_string(),
    };
    let table = Table::new(
        body,
        [
            Constraint::Percentage(40),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(if page.list_focus {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    });
    f.render_stateful_widget(table, rows[1], &mut page.tsel);
}

// Invoice by apartment and period

fn draw_invoice(f: &mut Frame, area: Rect, app: &mut App) {
    let page = &app.invoice;
    let mut lines = vec![
        field_line("Apartment", &page.apartment, page.focus == 0),
        field_line("Period", &page.period, page.focus == 1),
        Line::from(""),
        Line::from("Period as January-2024 or 01-2024. Enter downloads the invoice."),
        Line::from(""),
    ];
    if let Some(p) = &page.found {
        lines.push(Line::from(format!("Apartment Number: {}", p.apartment)));
        lines.push(Line::from(format!("Amount: {}", fmt_money(&p.amount))));
        lines.push(Line::from(format!("Date: {}", p.date)));
        lines.push(Line::from(vec![
            Span::raw("Status: "),
            Span::styled(p.status.label(), status_style(p.status)),
        ]));
        lines.push(Line::from(format!("Payment for - {}", p.description)));
    } else if page.missing {
        lines.push(Line::from(Span::styled(
            "Invoice not found",
            Style::default().fg(Color::Red),
        )));
    }

    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Invoice"))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_login(f: &mut Frame, area: Rect, app: &mut App) {
    let area = center_rect(area, 60, 9);
    let page = &app.login;
    let mut lines = vec![
        field_line("Email", &page.email, page.focus == 0),
        field_line("Password", &page.password, page.focus == 1),
        Line::from(""),
        Line::from("Tab: switch field | Enter: sign in | Esc: back"),
    ];
    if let Some(err) = &page.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    f.render_widget(Clear, area);
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Admin Login"));
    f.render_widget(p, area);
}

// Dashboard

fn draw_dashboard(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let tabs = Tabs::new(vec![Line::from("1 Payments"), Line::from("2 Expenses")])
        .select(match app.tab {
            DashTab::Payments => 0,
            DashTab::Expenses => 1,
        })
        .block(Block::default().borders(Borders::ALL).title("Dashboard  (l=logout, R=retry)"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(tabs, rows[0]);

    match app.tab {
        DashTab::Payments => draw_payments(f, rows[1], app),
        DashTab::Expenses => draw_expenses(f, rows[1], app),
    }
}

fn draw_payments(f: &mut Frame, area: Rect, app: &mut App) {
    let page = &mut app.payments;
    let header = Row::new(vec!["#", "Apartment", "Amount", "Date", "Description", "Status"]).height(1);
    let body: Vec<Row> = page
        .view
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.id.to_string()),
                Cell::from(p.apartment.clone()),
                Cell::from(fmt_money(&p.amount)),
                Cell::from(p.date.to_string()),
                Cell::from(p.description.clone()),
                Cell::from(p.status.label()).style(status_style(p.status)),
            ])
        })
        .collect();

    let mut title = String::from("Payments  (n=new e=edit x=delete g=generate d=invoice /=search f=filter c=clear r=refresh)");
    if let Some(a) = page.filter.apartment.as_deref().filter(|a| !a.is_empty()) {
        title.push_str(&format!("  apt={a}"));
    }
    if let Some(d) = page.filter.description.as_deref().filter(|d| !d.is_empty()) {
        title.push_str(&format!("  period={d}"));
    }
    if page.searching || !page.search.value.is_empty() {
        title.push_str(&format!("  search: {}", page.search.value));
        if page.searching {
            title.push('_');
        }
    }

    let widths = [
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Percentage(40),
        Constraint::Length(10),
    ];
    let table = Table::new(body, widths)
        .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, &mut page.tsel);

    if let Some(id) = page.confirm_delete {
        confirm_modal(f, area, &format!("Delete payment #{id}?"));
    }
    if let Some(form) = &page.filter_form {
        let modal = center_rect(area, 56, 8);
        f.render_widget(Clear, modal);
        let lines = vec![
            field_line("Apartment", &form.apartment, form.focus == 0),
            field_line("Period", &form.period, form.focus == 1),
            Line::from(""),
            Line::from("Exact match. Enter: apply | Esc: cancel"),
        ];
        let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Filter"));
        f.render_widget(p, modal);
    }
    if let Some(form) = &page.form {
        let modal = center_rect(area, 60, 12);
        f.render_widget(Clear, modal);
        draw_payment_form(f, modal, form);
    }
}

fn draw_payment_form(f: &mut Frame, area: Rect, form: &PaymentForm) {
    let mut lines = vec![
        field_line("Apartment", &form.apartment, form.focus == 0),
        field_line("Amount", &form.amount, form.focus == 1),
        field_line("Date", &form.date, form.focus == 2),
        choice_line("Period", form.description(), form.focus == 3),
        choice_line("Status", form.status.label(), form.focus == 4),
        Line::from(""),
        Line::from("Tab: next field | Left/Right: change | Enter: save | Esc: cancel"),
    ];
    if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    let title = match form.editing {
        Some(id) => format!("Edit Payment #{id}"),
        None => "New Payment".to_string(),
    };
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_expenses(f: &mut Frame, area: Rect, app: &mut App) {
    let page = &mut app.expenses;
    let header = Row::new(vec!["#", "Category", "Amount", "Date", "Description", "Status"]).height(1);
    let body: Vec<Row> = page
        .view
        .iter()
        .map(|e| {
            Row::new(vec![
                Cell::from(e.id.to_string()),
                Cell::from(e.category.clone()),
                Cell::from(fmt_money(&e.amount)),
                Cell::from(e.date.to_string()),
                Cell::from(e.description.clone()),
                Cell::from(e.status.label()).style(status_style(e.status)),
            ])
        })
        .collect();

    let mut title = String::from("Expenses  (n=new x=delete /=search r=refresh)");
    if page.searching || !page.search.value.is_empty() {
        title.push_str(&format!("  search: {}", page.search.value));
        if page.searching {
            title.push('_');
        }
    }
    let widths = [
        Constraint::Length(6),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Percentage(40),
        Constraint::Length(10),
    ];
    let table = Table::new(body, widths)
        .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, &mut page.tsel);

    if let Some(id) = page.confirm_delete {
        confirm_modal(f, area, &format!("Delete expense #{id}?"));
    }
    if let Some(form) = &page.form {
        let modal = center_rect(area, 60, 12);
        f.render_widget(Clear, modal);
        draw_expense_form(f, modal, form);
    }
}

fn draw_expense_form(f: &mut Frame, area: Rect, form: &ExpenseForm) {
    let mut lines = vec![
        field_line("Category", &form.category, form.focus == 0),
        field_line("Amount", &form.amount, form.focus == 1),
        field_line("Date", &form.date, form.focus == 2),
        field_line("Description", &form.description, form.focus == 3),
        choice_line("Status", form.status.label(), form.focus == 4),
        Line::from(""),
        Line::from("Tab: next field | Left/Right: status | Enter: save | Esc: cancel"),
    ];
    if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("New Expense"))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn confirm_modal(f: &mut Frame, area: Rect, question: &str) {
    let modal = center_rect(area, 40, 5);
    f.render_widget(Clear, modal);
    let p = Paragraph::new(vec![Line::from(question.to_string()), Line::from("y = yes, n = no")])
        .block(Block::default().borders(Borders::ALL).title("Confirm"));
    f.render_widget(p, modal);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let text = "\
Anywhere:  F1 help  F2 lookup  F3 invoice  F4 admin  Ctrl+C quit
Outside text fields:  q quit  R retry the last failed request

Lookup:     type an apartment number, Enter to search,
            Tab to the results, d or Enter downloads the invoice
Invoice:    apartment + period (January-2024 or 01-2024), Enter downloads
Admin:      sign in with email and password

Payments:   Up/Down select  n new  e edit  x delete (y/n)
            g generate this month's invoices  d download invoice
            / search text  f exact apartment/period filter  c clear  r refresh
Expenses:   Up/Down select  n new  x delete (y/n)  / search  r refresh
Dashboard:  1/2 or Tab switch tab  l logout

Invoices are written to INVOICE_DIR (default ./invoices).
Esc/b: back";
    let p = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}

fn center_rect(area: Rect, w: u16, h: u16) -> Rect {
    let w = w.min(area.width);
    let h = h.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
