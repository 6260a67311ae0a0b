// src/cli/state.rs
use chrono::{Datelike, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::TableState;
use tracing::{info, warn};

use crate::auth::{AuthContext, GateDecision};
use crate::billing::{BatchOutcome, PeriodLabel};
use crate::cli::api::Client;
use crate::cli::input::LineEdit;
use crate::cli::retry::{FailedAction, RetryableAction};
use crate::cli::util;
use crate::database::models::{Expense, NewExpense, NewPayment, Payment, PaymentPatch, RecordStatus};
use crate::search::{filter_records, RecordFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Lookup,
    Invoice,
    Login,
    Dashboard,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashTab {
    #[default]
    Payments,
    Expenses,
}

// ============= Public pages =============

#[derive(Default)]
pub struct LookupPage {
    pub apartment: LineEdit,
    pub searched_for: Option<String>,
    pub results: Vec<Payment>,
    pub tsel: TableState,
    pub list_focus: bool,
}

#[derive(Default)]
pub struct InvoicePage {
    pub apartment: LineEdit,
    pub period: LineEdit,
    // 0: apartment, 1: period
    pub focus: usize,
    pub found: Option<Payment>,
    pub missing: bool,
}

pub struct LoginPage {
    pub email: LineEdit,
    pub password: LineEdit,
    pub focus: usize,
    pub error: Option<String>,
}

impl Default for LoginPage {
    fn default() -> Self {
        Self {
            email: LineEdit::default(),
            password: LineEdit::password(),
            focus: 0,
            error: None,
        }
    }
}

// ============= Admin forms =============

pub struct PaymentForm {
    pub editing: Option<i64>,
    pub apartment: LineEdit,
    pub amount: LineEdit,
    pub date: LineEdit,
    pub periods: Vec<String>,
    pub period_idx: usize,
    pub status: RecordStatus,
    // 0: apartment, 1: amount, 2: date, 3: period, 4: status
    pub focus: usize,
    pub error: Option<String>,
}

impl PaymentForm {
    pub const FIELDS: usize = 5;

    pub fn blank(today: NaiveDate) -> Self {
        Self {
            editing: None,
            apartment: LineEdit::default(),
            amount: LineEdit::default(),
            date: LineEdit::with(util::iso(&today)),
            periods: month_choices(today.year()),
            period_idx: today.month0() as usize,
            status: RecordStatus::Unpaid,
            focus: 0,
            error: None,
        }
    }

    /// Pre-filled with `p`. A description outside the month choices is
    /// kept as an extra choice so saving does not silently rewrite it.
    pub fn for_payment(p: &Payment) -> Self {
        let year = p
            .description
            .parse::<PeriodLabel>()
            .map(|l| l.year())
            .unwrap_or_else(|_| p.date.year());
        let mut periods = month_choices(year);
        let period_idx = match periods.iter().position(|d| *d == p.description) {
            Some(i) => i,
            None => {
                periods.push(p.description.clone());
                periods.len() - 1
            }
        };
        Self {
            editing: Some(p.id),
            apartment: LineEdit::with(p.apartment.clone()),
            amount: LineEdit::with(util::fmt_money(&p.amount)),
            date: LineEdit::with(util::iso(&p.date)),
            periods,
            period_idx,
            status: p.status,
            focus: 0,
            error: None,
        }
    }

    pub fn description(&self) -> &str {
        self.periods.get(self.period_idx).map(String::as_str).unwrap_or("")
    }

    pub fn cycle_period(&mut self, delta: isize) {
        let n = self.periods.len() as isize;
        if n > 0 {
            self.period_idx = (self.period_idx as isize + delta).rem_euclid(n) as usize;
        }
    }

    fn text_field(&mut self) -> Option<&mut LineEdit> {
        match self.focus {
            0 => Some(&mut self.apartment),
            1 => Some(&mut self.amount),
            2 => Some(&mut self.date),
            _ => None,
        }
    }

    pub fn to_new(&self) -> Result<NewPayment, String> {
        let apartment = self.apartment.trimmed();
        if apartment.is_empty() {
            return Err("Apartment is required".into());
        }
        let amount = util::parse_money(&self.amount.value).ok_or("Amount must be a number")?;
        let date = util::parse_date(&self.date.value).ok_or("Date must be YYYY-MM-DD")?;
        if self.description().trim().is_empty() {
            return Err("Choose a period".into());
        }
        Ok(NewPayment {
            apartment: apartment.to_string(),
            amount,
            date,
            description: self.description().to_string(),
            status: self.status,
        })
    }
}

pub struct ExpenseForm {
    pub category: LineEdit,
    pub amount: LineEdit,
    pub date: LineEdit,
    pub description: LineEdit,
    pub status: RecordStatus,
    // 0: category, 1: amount, 2: date, 3: description, 4: status
    pub focus: usize,
    pub error: Option<String>,
}

impl ExpenseForm {
    pub const FIELDS: usize = 5;

    pub fn blank(today: NaiveDate) -> Self {
        Self {
            category: LineEdit::default(),
            amount: LineEdit::default(),
            date: LineEdit::with(util::iso(&today)),
            description: LineEdit::default(),
            status: RecordStatus::Unpaid,
            focus: 0,
            error: None,
        }
    }

    fn text_field(&mut self) -> Option<&mut LineEdit> {
        match self.focus {
            0 => Some(&mut self.category),
            1 => Some(&mut self.amount),
            2 => Some(&mut self.date),
            3 => Some(&mut self.description),
            _ => None,
        }
    }

    pub fn to_new(&self) -> Result<NewExpense, String> {
        let description = self.description.trimmed();
        if description.is_empty() {
            return Err("Description is required".into());
        }
        let amount = util::parse_money(&self.amount.value).ok_or("Amount must be a number")?;
        let date = util::parse_date(&self.date.value).ok_or("Date must be YYYY-MM-DD")?;
        Ok(NewExpense {
            amount,
            date,
            description: description.to_string(),
            category: self.category.trimmed().to_string(),
            status: self.status,
        })
    }
}

/// Exact apartment / period constraints sent to the store.
#[derive(Default)]
pub struct FilterForm {
    pub apartment: LineEdit,
    pub period: LineEdit,
    pub focus: usize,
}

#[derive(Default)]
pub struct PaymentsPage {
    pub all: Vec<Payment>,
    pub view: Vec<Payment>,
    pub tsel: TableState,
    pub filter: RecordFilter,
    pub search: LineEdit,
    pub searching: bool,
    pub filter_form: Option<FilterForm>,
    pub form: Option<PaymentForm>,
    pub confirm_delete: Option<i64>,
}

impl PaymentsPage {
    fn recompute(&mut self) {
        self.view = filter_records(&self.all, &self.search.value);
        clamp(&mut self.tsel, self.view.len());
    }

    pub fn selected(&self) -> Option<&Payment> {
        self.view.get(self.tsel.selected()?)
    }
}

#[derive(Default)]
pub struct ExpensesPage {
    pub all: Vec<Expense>,
    pub view: Vec<Expense>,
    pub tsel: TableState,
    pub search: LineEdit,
    pub searching: bool,
    pub form: Option<ExpenseForm>,
    pub confirm_delete: Option<i64>,
}

impl ExpensesPage {
    fn recompute(&mut self) {
        self.view = filter_records(&self.all, &self.search.value);
        clamp(&mut self.tsel, self.view.len());
    }

    pub fn selected(&self) -> Option<&Expense> {
        self.view.get(self.tsel.selected()?)
    }
}

/// What a finished action reports, and what it wants loaded afterwards.
struct Done {
    message: Option<String>,
    then: Option<RetryableAction>,
}

impl Done {
    fn quiet() -> Self {
        Self { message: None, then: None }
    }
    fn say(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), then: None }
    }
    fn then(mut self, next: RetryableAction) -> Self {
        self.then = Some(next);
        self
    }
}

pub struct App {
    pub api: Client,
    pub auth: AuthContext,
    pub screen: Screen,
    pub back: Screen,
    pub status: String,
    pub quit: bool,
    pub lookup: LookupPage,
    pub invoice: InvoicePage,
    pub login: LoginPage,
    pub tab: DashTab,
    pub payments: PaymentsPage,
    pub expenses: ExpensesPage,
    pub last_failure: Option<FailedAction>,
}

impl App {
    pub fn new(api: Client) -> Self {
        Self {
            api,
            auth: AuthContext::default(),
            screen: Screen::Lookup,
            back: Screen::Lookup,
            status: "F1 help | F2 lookup | F3 invoice | F4 admin | Ctrl+C quit".into(),
            quit: false,
            lookup: LookupPage::default(),
            invoice: InvoicePage::default(),
            login: LoginPage::default(),
            tab: DashTab::Payments,
            payments: PaymentsPage::default(),
            expenses: ExpensesPage::default(),
            last_failure: None,
        }
    }

    // ============= Requests =============

    /// Runs `action` and whatever reload it asks for. A failure is kept so
    /// `R` can issue the same request again.
    pub async fn perform(&mut self, action: RetryableAction) {
        let mut next = Some(action);
        while let Some(action) = next.take() {
            if action.is_protected() && !self.auth.is_authenticated() {
                self.require_login();
                return;
            }
            match self.execute(&action).await {
                Ok(done) => {
                    if let Some(message) = done.message {
                        self.status = message;
                    }
                    if self.last_failure.as_ref().is_some_and(|f| f.action == action) {
                        self.last_failure = None;
                    }
                    next = done.then;
                }
                Err(e) => {
                    warn!(action = %action.describe(), error = %e, "request failed");
                    self.status = format!("{} failed: {e}. Press R to retry.", action.describe());
                    self.last_failure = Some(FailedAction {
                        action,
                        error: e.to_string(),
                    });
                    return;
                }
            }
        }
    }

    pub async fn retry(&mut self) {
        match self.last_failure.take() {
            Some(failed) => {
                info!(action = %failed.action.describe(), "retrying");
                self.perform(failed.action).await;
            }
            None => self.status = "Nothing to retry".into(),
        }
    }

    async fn execute(&mut self, action: &RetryableAction) -> anyhow::Result<Done> {
        use RetryableAction as A;

        let done = match action {
            A::LookupPayments { apartment } => {
                let found = self.api.payments_for_apartment(apartment).await?;
                let msg = format!("{} payment(s) for apartment {apartment}", found.len());
                self.lookup.results = found;
                self.lookup.searched_for = Some(apartment.clone());
                self.lookup.tsel = TableState::default();
                clamp(&mut self.lookup.tsel, self.lookup.results.len());
                Done::say(msg)
            }
            A::FindInvoice { apartment, period } => {
                match self.api.find_invoice(apartment, period).await? {
                    Some(payment) => {
                        self.invoice.missing = false;
                        self.invoice.found = Some(payment.clone());
                        Done::quiet().then(A::DownloadInvoice(payment))
                    }
                    None => {
                        self.invoice.found = None;
                        self.invoice.missing = true;
                        Done::say(format!("No invoice for apartment {apartment} and {period}"))
                    }
                }
            }
            A::DownloadInvoice(payment) => {
                let path = self.api.download_invoice(payment).await?;
                Done::say(format!("Invoice saved to {}", path.display()))
            }
            A::RefreshPayments { filter } => {
                let rows = self.api.list_payments(filter).await?;
                self.payments.all = rows;
                self.payments.filter = filter.clone();
                self.payments.recompute();
                Done::quiet()
            }
            A::RefreshExpenses => {
                self.expenses.all = self.api.list_expenses().await?;
                self.expenses.recompute();
                Done::quiet()
            }
            A::InsertPayment(new) => {
                let next = self.reload_payments();
                let stored = self.api.create_payment(new).await?;
                self.payments.form = None;
                Done::say(format!("Payment #{} saved", stored.id)).then(next)
            }
            A::UpdatePayment { id, patch } => {
                let next = self.reload_payments();
                self.api.update_payment(*id, patch).await?;
                self.payments.form = None;
                Done::say(format!("Payment #{id} updated")).then(next)
            }
            A::DeletePayment { id } => {
                let next = self.reload_payments();
                self.api.delete_payment(*id).await?;
                Done::say(format!("Payment #{id} deleted")).then(next)
            }
            A::GenerateBatch { today } => {
                let next = self.reload_payments();
                let outcome = self.api.generate_batch(*today).await?;
                match outcome {
                    BatchOutcome::Created { .. } => Done::say(outcome.message()).then(next),
                    BatchOutcome::AlreadyExists { .. } => Done::say(outcome.message()),
                }
            }
            A::InsertExpense(new) => {
                let stored = self.api.create_expense(new).await?;
                self.expenses.form = None;
                Done::say(format!("Expense #{} saved", stored.id)).then(A::RefreshExpenses)
            }
            A::DeleteExpense { id } => {
                self.api.delete_expense(*id).await?;
                Done::say(format!("Expense #{id} deleted")).then(A::RefreshExpenses)
            }
        };
        Ok(done)
    }

    fn reload_payments(&self) -> RetryableAction {
        RetryableAction::RefreshPayments {
            filter: self.payments.filter.clone(),
        }
    }

    // ============= Auth =============

    fn require_login(&mut self) {
        self.screen = Screen::Login;
        self.login.error = None;
        self.status = "Sign in to manage payments".into();
    }

    /// Protected entry point: the gate decides before anything renders.
    pub async fn open_dashboard(&mut self) {
        match self.api.gate().evaluate(&mut self.auth).await {
            GateDecision::Render => {
                self.screen = Screen::Dashboard;
                self.perform(self.reload_payments()).await;
                self.perform(RetryableAction::RefreshExpenses).await;
            }
            GateDecision::RedirectToLogin => self.require_login(),
        }
    }

    async fn submit_login(&mut self) {
        let email = self.login.email.trimmed().to_string();
        let password = self.login.password.value.clone();
        if email.is_empty() || password.is_empty() {
            self.login.error = Some("Email and password are required".into());
            return;
        }
        match self.api.gate().login(&mut self.auth, &email, &password).await {
            Ok(()) => {
                self.login = LoginPage::default();
                self.open_dashboard().await;
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.login.password.clear();
                self.login.error = Some(e.localized());
            }
        }
    }

    async fn logout(&mut self) {
        if let Err(e) = self.api.gate().logout(&mut self.auth).await {
            warn!(error = %e, "logout did not reach the server");
        }
        self.payments = PaymentsPage::default();
        self.expenses = ExpensesPage::default();
        if self.last_failure.as_ref().is_some_and(|f| f.action.is_protected()) {
            self.last_failure = None;
        }
        self.screen = Screen::Lookup;
        self.status = "Signed out".into();
    }

    // ============= Keys =============

    /// True when printable keys belong to a text field.
    pub fn typing(&self) -> bool {
        match self.screen {
            Screen::Lookup => !self.lookup.list_focus,
            Screen::Invoice | Screen::Login => true,
            Screen::Help => false,
            Screen::Dashboard => match self.tab {
                DashTab::Payments => {
                    self.payments.searching
                        || self.payments.filter_form.is_some()
                        || self.payments.form.is_some()
                }
                DashTab::Expenses => {
                    self.expenses.searching
                        || self.expenses.form.is_some()
                }
            },
        }
    }

    pub async fn handle_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        if k.kind != KeyEventKind::Press {
            return Ok(());
        }
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.quit = true;
            return Ok(());
        }

        match k.code {
            KeyCode::F(1) => {
                if self.screen != Screen::Help {
                    self.back = self.screen;
                }
                self.screen = Screen::Help;
                return Ok(());
            }
            KeyCode::F(2) => {
                self.screen = Screen::Lookup;
                return Ok(());
            }
            KeyCode::F(3) => {
                self.screen = Screen::Invoice;
                return Ok(());
            }
            KeyCode::F(4) => {
                self.open_dashboard().await;
                return Ok(());
            }
            _ => {}
        }

        if !self.typing() {
            match k.code {
                KeyCode::Char('q') => {
                    self.quit = true;
                    return Ok(());
                }
                KeyCode::Char('R') => {
                    self.retry().await;
                    return Ok(());
                }
                _ => {}
            }
        }

        match self.screen {
            Screen::Lookup => self.lookup_key(k.code).await,
            Screen::Invoice => self.invoice_key(k.code).await,
            Screen::Login => self.login_key(k.code).await,
            Screen::Dashboard => match self.tab {
                DashTab::Payments => self.payments_key(k.code).await,
                DashTab::Expenses => self.expenses_key(k.code).await,
            },
            Screen::Help => {
                if matches!(k.code, KeyCode::Esc | KeyCode::Char('b')) {
                    self.screen = self.back;
                }
            }
        }
        Ok(())
    }

    async fn lookup_key(&mut self, code: KeyCode) {
        let page = &mut self.lookup;
        if page.list_focus {
            match code {
                KeyCode::Up => move_sel(&mut page.tsel, page.results.len(), -1),
                KeyCode::Down => move_sel(&mut page.tsel, page.results.len(), 1),
                KeyCode::Enter | KeyCode::Char('d') => {
                    if let Some(p) = page.tsel.selected().and_then(|i| page.results.get(i)) {
                        let action = RetryableAction::DownloadInvoice(p.clone());
                        self.perform(action).await;
                    }
                }
                KeyCode::Tab | KeyCode::Esc => page.list_focus = false,
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Enter => {
                let apartment = page.apartment.trimmed().to_string();
                if apartment.is_empty() {
                    self.status = "Enter an apartment number".into();
                } else {
                    self.perform(RetryableAction::LookupPayments { apartment }).await;
                }
            }
            KeyCode::Tab | KeyCode::Down => {
                if !page.results.is_empty() {
                    page.list_focus = true;
                }
            }
            KeyCode::Esc => {
                page.apartment.clear();
                page.results.clear();
                page.searched_for = None;
            }
            other => {
                if page.apartment.handle(other)
                    && page.searched_for.as_deref() != Some(page.apartment.trimmed())
                {
                    page.results.clear();
                    page.searched_for = None;
                }
            }
        }
    }

    async fn invoice_key(&mut self, code: KeyCode) {
        let page = &mut self.invoice;
        match code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                page.focus = 1 - page.focus;
            }
            KeyCode::Enter => {
                let apartment = page.apartment.trimmed().to_string();
                let period = util::normalize_period(&page.period.value);
                if apartment.is_empty() || period.is_empty() {
                    self.status = "Enter an apartment and a period".into();
                    return;
                }
                self.perform(RetryableAction::FindInvoice { apartment, period }).await;
            }
            KeyCode::Esc => {
                *page = InvoicePage::default();
            }
            other => {
                let field = if page.focus == 0 { &mut page.apartment } else { &mut page.period };
                if field.handle(other) {
                    page.found = None;
                    page.missing = false;
                }
            }
        }
    }

    async fn login_key(&mut self, code: KeyCode) {
        let page = &mut self.login;
        match code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                page.focus = 1 - page.focus;
            }
            KeyCode::Enter => self.submit_login().await,
            KeyCode::Esc => {
                *page = LoginPage::default();
                self.screen = Screen::Lookup;
            }
            other => {
                let field = if page.focus == 0 { &mut page.email } else { &mut page.password };
                field.handle(other);
            }
        }
    }

    /// Keys every dashboard tab shares. Returns true when consumed.
    async fn dashboard_common_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('1') => self.tab = DashTab::Payments,
            KeyCode::Char('2') => self.tab = DashTab::Expenses,
            KeyCode::Tab => {
                self.tab = match self.tab {
                    DashTab::Payments => DashTab::Expenses,
                    DashTab::Expenses => DashTab::Payments,
                }
            }
            KeyCode::Char('l') => self.logout().await,
            KeyCode::Char('?') => {
                self.back = Screen::Dashboard;
                self.screen = Screen::Help;
            }
            _ => return false,
        }
        true
    }

    async fn payments_key(&mut self, code: KeyCode) {
        if self.payments.form.is_some() {
            self.payment_form_key(code).await;
            return;
        }
        if let Some(id) = self.payments.confirm_delete {
            match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.payments.confirm_delete = None;
                    self.perform(RetryableAction::DeletePayment { id }).await;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.payments.confirm_delete = None;
                    self.status = "Delete cancelled".into();
                }
                _ => {}
            }
            return;
        }
        if self.payments.filter_form.is_some() {
            self.filter_form_key(code).await;
            return;
        }
        if self.payments.searching {
            let page = &mut self.payments;
            match code {
                KeyCode::Enter => page.searching = false,
                KeyCode::Esc => {
                    page.searching = false;
                    page.search.clear();
                    page.recompute();
                }
                other => {
                    if page.search.handle(other) {
                        page.recompute();
                    }
                }
            }
            return;
        }

        if self.dashboard_common_key(code).await {
            return;
        }
        let today = util::today();
        match code {
            KeyCode::Up => move_sel(&mut self.payments.tsel, self.payments.view.len(), -1),
            KeyCode::Down => move_sel(&mut self.payments.tsel, self.payments.view.len(), 1),
            KeyCode::Char('/') => self.payments.searching = true,
            KeyCode::Char('f') => {
                let current = &self.payments.filter;
                self.payments.filter_form = Some(FilterForm {
                    apartment: LineEdit::with(current.apartment.clone().unwrap_or_default()),
                    period: LineEdit::with(current.description.clone().unwrap_or_default()),
                    focus: 0,
                });
            }
            KeyCode::Char('c') => {
                self.payments.search.clear();
                let action = RetryableAction::RefreshPayments { filter: RecordFilter::default() };
                self.perform(action).await;
            }
            KeyCode::Char('r') => {
                let filter = self.payments.filter.clone();
                self.perform(RetryableAction::RefreshPayments { filter }).await;
            }
            KeyCode::Char('n') => self.payments.form = Some(PaymentForm::blank(today)),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(p) = self.payments.selected() {
                    self.payments.form = Some(PaymentForm::for_payment(p));
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(p) = self.payments.selected() {
                    self.payments.confirm_delete = Some(p.id);
                }
            }
            KeyCode::Char('g') => self.perform(RetryableAction::GenerateBatch { today }).await,
            KeyCode::Char('d') => {
                if let Some(p) = self.payments.selected().cloned() {
                    self.perform(RetryableAction::DownloadInvoice(p)).await;
                }
            }
            _ => {}
        }
    }

    async fn payment_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.payments.form.as_mut() else { return };
        match code {
            KeyCode::Esc => {
                self.payments.form = None;
            }
            KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % PaymentForm::FIELDS,
            KeyCode::BackTab | KeyCode::Up => {
                form.focus = (form.focus + PaymentForm::FIELDS - 1) % PaymentForm::FIELDS
            }
            KeyCode::Left if form.focus == 3 => form.cycle_period(-1),
            KeyCode::Right if form.focus == 3 => form.cycle_period(1),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.focus == 4 => {
                form.status = form.status.toggled()
            }
            KeyCode::Enter => {
                let new = match form.to_new() {
                    Ok(new) => new,
                    Err(msg) => {
                        form.error = Some(msg);
                        return;
                    }
                };
                let action = match form.editing {
                    Some(id) => RetryableAction::UpdatePayment {
                        id,
                        patch: PaymentPatch::replace_with(&new),
                    },
                    None => RetryableAction::InsertPayment(new),
                };
                self.perform(action).await;
                // still open means the request failed
                if let Some(form) = self.payments.form.as_mut() {
                    form.error = Some(self.status.clone());
                }
            }
            other => {
                if let Some(field) = form.text_field() {
                    field.handle(other);
                }
            }
        }
    }

    async fn filter_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.payments.filter_form.as_mut() else { return };
        match code {
            KeyCode::Esc => self.payments.filter_form = None,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.focus = 1 - form.focus
            }
            KeyCode::Enter => {
                let period = util::normalize_period(&form.period.value);
                let filter = RecordFilter {
                    apartment: Some(form.apartment.trimmed().to_string()),
                    description: Some(period),
                    text: None,
                };
                self.payments.filter_form = None;
                if filter.payment_query().is_none() {
                    self.status = "Enter an apartment or a period to filter by".into();
                    return;
                }
                self.perform(RetryableAction::RefreshPayments { filter }).await;
            }
            other => {
                let field = if form.focus == 0 { &mut form.apartment } else { &mut form.period };
                field.handle(other);
            }
        }
    }

    async fn expenses_key(&mut self, code: KeyCode) {
        if self.expenses.form.is_some() {
            self.expense_form_key(code).await;
            return;
        }
        if let Some(id) = self.expenses.confirm_delete {
            match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.expenses.confirm_delete = None;
                    self.perform(RetryableAction::DeleteExpense { id }).await;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.expenses.confirm_delete = None;
                    self.status = "Delete cancelled".into();
                }
                _ => {}
            }
            return;
        }
        if self.expenses.searching {
            let page = &mut self.expenses;
            match code {
                KeyCode::Enter => page.searching = false,
                KeyCode::Esc => {
                    page.searching = false;
                    page.search.clear();
                    page.recompute();
                }
                other => {
                    if page.search.handle(other) {
                        page.recompute();
                    }
                }
            }
            return;
        }

        if self.dashboard_common_key(code).await {
            return;
        }
        match code {
            KeyCode::Up => move_sel(&mut self.expenses.tsel, self.expenses.view.len(), -1),
            KeyCode::Down => move_sel(&mut self.expenses.tsel, self.expenses.view.len(), 1),
            KeyCode::Char('/') => self.expenses.searching = true,
            KeyCode::Char('r') => self.perform(RetryableAction::RefreshExpenses).await,
            KeyCode::Char('n') => self.expenses.form = Some(ExpenseForm::blank(util::today())),
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(e) = self.expenses.selected() {
                    self.expenses.confirm_delete = Some(e.id);
                }
            }
            _ => {}
        }
    }

    async fn expense_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.expenses.form.as_mut() else { return };
        match code {
            KeyCode::Esc => self.expenses.form = None,
            KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % ExpenseForm::FIELDS,
            KeyCode::BackTab | KeyCode::Up => {
                form.focus = (form.focus + ExpenseForm::FIELDS - 1) % ExpenseForm::FIELDS
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.focus == 4 => {
                form.status = form.status.toggled()
            }
            KeyCode::Enter => {
                let new = match form.to_new() {
                    Ok(new) => new,
                    Err(msg) => {
                        form.error = Some(msg);
                        return;
                    }
                };
                self.perform(RetryableAction::InsertExpense(new)).await;
                if let Some(form) = self.expenses.form.as_mut() {
                    form.error = Some(self.status.clone());
                }
            }
            other => {
                if let Some(field) = form.text_field() {
                    field.handle(other);
                }
            }
        }
    }
}

fn month_choices(year: i32) -> Vec<String> {
    PeriodLabel::year_options(year).iter().map(|l| l.to_string()).collect()
}

fn clamp(sel: &mut TableState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        (_, None) => sel.select(Some(0)),
        _ => {}
    }
}

fn move_sel(sel: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        sel.select(None);
        return;
    }
    let cur = sel.selected().unwrap_or(0) as isize;
    sel.select(Some((cur + delta).rem_euclid(len as isize) as usize));
}
