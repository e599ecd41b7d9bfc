//! Application state and view state definitions.
//!
//! The app owns no catalog data. It holds the search parameters and one
//! observer per visible query, and after every event turns the observers'
//! snapshots into the view states the renderer draws.

use crate::keys::Action;
use crate::nav::{Focus, Screen};
use crate::notifications::{Notification, NotificationLevel};
use crate::queries::BookQueries;
use crate::theme::Theme;
use libris_core::{
    max_pages, Author, BookDetail, BookId, LibrisResult, QueryKey, SearchPage, SearchResult,
};
use libris_storage::{CacheEvent, ObserveOptions, QueryClient, QueryObserver, QueryResult};
use std::time::Duration;
use tui_textarea::TextArea;

const MAX_NOTIFICATIONS: usize = 20;
const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// What the result area shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsState {
    /// No search yet.
    Empty,
    Pending,
    Error(String),
    NoResults,
    Ready {
        page: SearchPage,
        /// The page belongs to the previous page number and is shown dimmed.
        placeholder: bool,
        fetching: bool,
    },
}

impl ResultsState {
    pub fn from_query(result: QueryResult<SearchPage>) -> Self {
        if result.is_pending() {
            return if result.is_fetching() {
                ResultsState::Pending
            } else {
                ResultsState::Empty
            };
        }
        if result.is_error() {
            let message = result
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return ResultsState::Error(message);
        }
        let fetching = result.is_fetching();
        match result.data {
            Some(page) if page.is_empty() => ResultsState::NoResults,
            Some(page) => ResultsState::Ready {
                page,
                placeholder: result.is_placeholder_data,
                fetching,
            },
            None => ResultsState::Pending,
        }
    }

    pub fn page(&self) -> Option<&SearchPage> {
        match self {
            ResultsState::Ready { page, .. } => Some(page),
            _ => None,
        }
    }

    pub fn docs(&self) -> &[SearchResult] {
        self.page().map(|page| page.docs.as_slice()).unwrap_or(&[])
    }

    pub fn max_pages(&self) -> u32 {
        self.page().map(|page| max_pages(page.num_found)).unwrap_or(0)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ResultsState::Ready { placeholder: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthorState {
    /// The book names no author.
    Unknown,
    Pending,
    Error(String),
    Ready(Author),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Closed,
    Pending,
    Error(String),
    Ready {
        book: BookDetail,
        author: AuthorState,
        fetching: bool,
    },
}

pub struct App {
    pub client: QueryClient,
    pub queries: BookQueries,
    pub theme: Theme,
    pub screen: Screen,
    pub focus: Focus,
    pub input: TextArea<'static>,

    pub filter: String,
    pub page: u32,
    pub selected: usize,
    pub detail_id: Option<BookId>,

    pub results: ResultsState,
    pub detail: DetailState,

    pub notifications: Vec<Notification>,
    pub should_quit: bool,

    list_observer: QueryObserver<SearchPage>,
    detail_observer: QueryObserver<BookDetail>,
    author_observer: QueryObserver<Author>,
}

impl App {
    pub fn new(client: QueryClient, queries: BookQueries) -> Self {
        let mut input = TextArea::default();
        input.set_placeholder_text("Search books by title, author or subject");
        Self {
            list_observer: client.subscribe(),
            detail_observer: client.subscribe(),
            author_observer: client.subscribe(),
            client,
            queries,
            theme: Theme::default(),
            screen: Screen::Search,
            focus: Focus::Input,
            input,
            filter: String::new(),
            page: 1,
            selected: 0,
            detail_id: None,
            results: ResultsState::Empty,
            detail: DetailState::Closed,
            notifications: Vec::new(),
            should_quit: false,
        }
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Edit(key) => {
                self.input.input(key);
            }
            Action::Submit => self.submit(),
            Action::ToggleFocus => self.focus = self.focus.toggle(),
            Action::MoveUp => self.select_prev(),
            Action::MoveDown => self.select_next(),
            Action::PrevPage => self.prev_page(),
            Action::NextPage => self.next_page(),
            Action::Open => self.open_selected(),
            Action::Back => self.close_detail(),
            Action::Refresh => self.refresh(),
        }
    }

    pub fn list_key(&self) -> QueryKey {
        QueryKey::book_list(self.filter.clone(), self.page)
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results.docs().get(self.selected)
    }

    /// Text currently typed into the search form.
    pub fn input_text(&self) -> String {
        self.input.lines().join(" ")
    }

    pub fn submit(&mut self) {
        let text = self.input_text();
        self.submit_filter(&text);
        if !self.filter.is_empty() {
            self.focus = Focus::Results;
        }
    }

    /// Search for `filter`. A new filter starts again at page 1; submitting
    /// the current filter again changes nothing.
    pub fn submit_filter(&mut self, filter: &str) {
        let filter = filter.trim();
        if filter == self.filter {
            return;
        }
        tracing::debug!(filter, "Filter changed");
        self.filter = filter.to_string();
        self.page = 1;
        self.selected = 0;
        self.sync();
    }

    pub fn next_page(&mut self) {
        if self.page < self.results.max_pages() {
            self.set_page(self.page + 1);
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.set_page(self.page - 1);
        }
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
        self.selected = 0;
        self.sync();
    }

    pub fn select_next(&mut self) {
        let len = self.results.docs().len();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
            self.prefetch_selected();
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.prefetch_selected();
        }
    }

    /// Warm the cache with the selected book's details.
    pub fn prefetch_selected(&self) {
        if self.results.is_placeholder() {
            return;
        }
        let Some(result) = self.selected_result() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.client.clone();
        let desc = self.queries.details(&result.id);
        handle.spawn(async move {
            client.prefetch_query(&desc).await;
        });
    }

    pub fn open_selected(&mut self) {
        if let Some(id) = self.selected_result().map(|result| result.id.clone()) {
            self.open_detail(id);
        }
    }

    pub fn open_detail(&mut self, id: BookId) {
        tracing::debug!(book = %id, "Opening detail");
        self.detail_id = Some(id);
        self.screen = Screen::Detail;
        self.sync();
    }

    pub fn close_detail(&mut self) {
        self.detail_id = None;
        self.screen = Screen::Search;
        self.detail_observer.detach();
        self.author_observer.detach();
        self.detail = DetailState::Closed;
        self.sync();
    }

    /// Mark the visible queries stale and refetch them.
    pub fn refresh(&mut self) {
        let keys = match (&self.screen, &self.detail_id) {
            (Screen::Detail, Some(id)) => {
                let mut keys = vec![QueryKey::book_detail(id.clone())];
                if let DetailState::Ready { book, .. } = &self.detail {
                    if book.author_id.is_some() {
                        keys.push(QueryKey::author_detail(book.author_id.clone()));
                    }
                }
                keys
            }
            _ => vec![self.list_key()],
        };
        for key in &keys {
            if let Err(err) = self.client.invalidate(key) {
                self.notify(NotificationLevel::Error, format!("Refresh failed: {}", err));
            }
        }
        self.sync();
    }

    pub fn on_cache_event(&mut self, event: &CacheEvent) {
        let relevant = match event {
            CacheEvent::Updated(key) | CacheEvent::Removed(key) => self.observes(key),
            CacheEvent::Cleared => true,
        };
        if relevant {
            self.sync();
        }
    }

    pub fn on_tick(&mut self) {
        match self.client.gc() {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(evicted, "Evicted unused queries"),
            Err(err) => tracing::warn!(error = %err, "Garbage collection failed"),
        }
        let now = chrono::Utc::now();
        self.notifications
            .retain(|note| !note.is_expired(NOTIFICATION_TTL, now));
    }

    fn observes(&self, key: &QueryKey) -> bool {
        [
            self.list_observer.key(),
            self.detail_observer.key(),
            self.author_observer.key(),
        ]
        .into_iter()
        .flatten()
        .any(|observed| observed == key)
    }

    /// Re-read every visible query and rebuild the view states.
    pub fn sync(&mut self) {
        if let Err(err) = self.sync_results() {
            self.notify(NotificationLevel::Error, err.to_string());
        }
        if let Err(err) = self.sync_detail() {
            self.notify(NotificationLevel::Error, err.to_string());
        }
    }

    fn sync_results(&mut self) -> LibrisResult<()> {
        let desc = self.queries.list(&self.filter, self.page);
        let filter = self.filter.clone();
        // Keep the previous page on screen only while paging the same filter.
        let options = ObserveOptions::new().with_placeholder_data(
            move |previous: Option<&SearchPage>, key: Option<&QueryKey>| {
                let same_filter = key
                    .and_then(QueryKey::list_params)
                    .is_some_and(|params| params.filter == filter);
                if same_filter {
                    previous.cloned()
                } else {
                    None
                }
            },
        );
        let result = self.list_observer.observe(&desc, &options)?;
        self.results = ResultsState::from_query(result);

        let len = self.results.docs().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
        Ok(())
    }

    fn sync_detail(&mut self) -> LibrisResult<()> {
        let Some(id) = self.detail_id.clone() else {
            self.detail = DetailState::Closed;
            return Ok(());
        };

        let desc = self.queries.details(&id);
        let client = self.client.clone();
        let list_key = self.list_key();
        // Title, author and cover come from the list entry until the record lands.
        let options = ObserveOptions::new().with_initial_data(move || {
            client
                .get_query_data::<SearchPage>(&list_key)
                .ok()
                .flatten()
                .and_then(|page| page.find(&id).map(BookDetail::skeleton))
        });
        let result = self.detail_observer.observe(&desc, &options)?;

        self.detail = if result.is_error() {
            DetailState::Error(
                result
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        } else {
            let fetching = result.is_fetching();
            match result.data {
                Some(book) => {
                    let author = self.sync_author(&book)?;
                    DetailState::Ready {
                        book,
                        author,
                        fetching,
                    }
                }
                None => DetailState::Pending,
            }
        };
        Ok(())
    }

    fn sync_author(&mut self, book: &BookDetail) -> LibrisResult<AuthorState> {
        let desc = self.queries.author(book.author_id.as_ref());
        let result = self.author_observer.observe(&desc, &ObserveOptions::new())?;
        if book.author_id.is_none() {
            return Ok(AuthorState::Unknown);
        }
        Ok(if result.is_error() {
            AuthorState::Error(
                result
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        } else {
            match result.data {
                Some(author) => AuthorState::Ready(author),
                None => AuthorState::Pending,
            }
        })
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        if level == NotificationLevel::Error {
            tracing::error!(%message, "Notification");
        }
        self.notifications.push(Notification::new(level, message));
        if self.notifications.len() > MAX_NOTIFICATIONS {
            let overflow = self.notifications.len() - MAX_NOTIFICATIONS;
            self.notifications.drain(0..overflow);
        }
    }
}
