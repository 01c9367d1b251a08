//! The table-driven prompt and chat experiments. One handler pair serves
//! every entry; a page is its template, its form inputs, and its memory
//! strategy.

use std::collections::HashMap;

use axum::Form;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::warn;

use crate::llm::ChatOptions;
use crate::memory::{self, ChatMessage, Memory, Turn};
use crate::session::Session;
use crate::{PlaygroundError, Result};

use super::{AppState, error_status, views};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Prompt,
    Chat,
}

impl Section {
    fn prefix(self) -> &'static str {
        match self {
            Section::Prompt => "prompt",
            Section::Chat => "chat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStrategy {
    /// Stateless: each submission is independent
    None,
    /// Verbatim transcript replayed into every chat call
    Buffer,
    /// Rolling summary folded after each exchange; lossy by design
    Summary,
}

#[derive(Debug, Clone, Copy)]
pub struct PageInput {
    pub name: &'static str,
    pub label: &'static str,
}

/// One experiment page: a prompt template plus form inputs and a memory
/// strategy
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub slug: &'static str,
    pub section: Section,
    pub title: &'static str,
    pub blurb: &'static str,
    pub temperature: f32,
    pub template: &'static str,
    pub inputs: &'static [PageInput],
    pub memory: MemoryStrategy,
}

const INPUT_ONLY: &[PageInput] = &[PageInput {
    name: "input",
    label: "Input",
}];

const OPEN_METEO_DOCS: &str = "BASE URL: https://api.open-meteo.com/\n\n\
API Documentation\n\
The API endpoint /v1/forecast accepts a geographical coordinate, a list of \
weather variables and responds with a JSON hourly weather forecast for 7 days. \
Time always starts at 0:00 today. All URL parameters are listed below:\n\n\
Parameter\tFormat\tRequired\tDescription\n\
latitude, longitude\tFloating point\tYes\tGeographical WGS84 coordinate of the location\n\
hourly\tString array\tNo\tA list of weather variables which should be returned\n\
daily\tString array\tNo\tA list of daily weather variable aggregations which should be returned\n\
current_weather\tBool\tNo\tInclude current weather conditions in the JSON output\n\
temperature_unit\tString\tNo\tIf fahrenheit is set, all temperature values are converted to Fahrenheit\n\
windspeed_unit\tString\tNo\tOther wind speed units: ms, mph and kn\n\
timezone\tString\tNo\tIf timezone is set, all timestamps are returned as local-time\n\
past_days\tInteger (0-2)\tNo\tIf past_days is set, yesterday or the day before yesterday data are also returned";

pub const PAGES: &[Page] = &[
    Page {
        slug: "company",
        section: Section::Prompt,
        title: "Company name",
        blurb: "Enter a product, receive a company name.",
        temperature: 0.7,
        template: "What would be a good company name for a company that makes {product}?",
        inputs: &[PageInput {
            name: "product",
            label: "Product",
        }],
        memory: MemoryStrategy::None,
    },
    Page {
        slug: "translate",
        section: Section::Prompt,
        title: "Translate",
        blurb: "Enter a language and phrase, receive a translation.",
        temperature: 0.0,
        template: "Translate the following phrase into {language}: ```{phrase}```. \
                   If you don't know the language, say so.",
        inputs: &[
            PageInput {
                name: "language",
                label: "Language",
            },
            PageInput {
                name: "phrase",
                label: "Phrase",
            },
        ],
        memory: MemoryStrategy::None,
    },
    Page {
        slug: "weather",
        section: Section::Prompt,
        title: "Weather request builder",
        blurb: "Builds the Open-Meteo API request for a location from the embedded API docs.",
        temperature: 0.0,
        template: "You are given the following API documentation:\n\n{docs}\n\n\
                   Using the documentation above, write the full URL of an API request \
                   that retrieves the current weather for this location: {location}. \
                   Then briefly explain the parameters you chose.",
        inputs: &[PageInput {
            name: "location",
            label: "Location",
        }],
        memory: MemoryStrategy::None,
    },
    Page {
        slug: "basic",
        section: Section::Chat,
        title: "Basic chat",
        blurb: "A single chat call with no memory between submissions.",
        temperature: 0.7,
        template: "{input}",
        inputs: INPUT_ONLY,
        memory: MemoryStrategy::None,
    },
    Page {
        slug: "memory",
        section: Section::Chat,
        title: "Chat with memory",
        blurb: "Interact with the chatbot; the full conversation is replayed each turn.",
        temperature: 0.5,
        template: "{input}",
        inputs: INPUT_ONLY,
        memory: MemoryStrategy::Buffer,
    },
    Page {
        slug: "summary",
        section: Section::Chat,
        title: "Chat with summary memory",
        blurb: "Interact with the chatbot; memory is a rolling summary instead of a transcript.",
        temperature: 0.3,
        template: "{input}",
        inputs: INPUT_ONLY,
        memory: MemoryStrategy::Summary,
    },
];

impl Page {
    #[inline]
    pub fn path(&self) -> String {
        format!("/{}/{}", self.section.prefix(), self.slug)
    }

    fn memory_key(&self) -> String {
        format!("memory:{}", self.slug)
    }

    /// Substitute every form input into the template by placeholder name.
    /// The weather page also carries a baked-in `{docs}` placeholder.
    fn render_template(&self, fields: &HashMap<String, String>) -> String {
        let mut rendered = self.template.replace("{docs}", OPEN_METEO_DOCS);
        for input in self.inputs {
            let value = fields.get(input.name).map(String::as_str).unwrap_or("");
            rendered = rendered.replace(&format!("{{{}}}", input.name), value);
        }
        rendered
    }
}

#[inline]
pub fn page_by_slug(section: Section, slug: &str) -> Option<&'static Page> {
    PAGES
        .iter()
        .find(|page| page.section == section && page.slug == slug)
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
pub(super) async fn show_prompt(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
) -> Response {
    show_page(&state, &jar, Section::Prompt, &slug)
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
pub(super) async fn show_chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
) -> Response {
    show_page(&state, &jar, Section::Chat, &slug)
}

pub(super) async fn submit_prompt(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    submit_page(&state, jar, Section::Prompt, &slug, &fields).await
}

pub(super) async fn submit_chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    submit_page(&state, jar, Section::Chat, &slug, &fields).await
}

fn show_page(state: &AppState, jar: &SignedCookieJar, section: Section, slug: &str) -> Response {
    let Some(page) = page_by_slug(section, slug) else {
        return (
            StatusCode::NOT_FOUND,
            Html(views::not_found_page("No such experiment page.")),
        )
            .into_response();
    };

    let session = state.sessions.load_or_empty(jar);
    let (transcript, summary) = stored_memory(&session, page);

    Html(views::experiment_page(
        page,
        &transcript,
        None,
        summary.as_deref(),
        None,
    ))
    .into_response()
}

async fn submit_page(
    state: &AppState,
    jar: SignedCookieJar,
    section: Section,
    slug: &str,
    fields: &HashMap<String, String>,
) -> Response {
    let Some(page) = page_by_slug(section, slug) else {
        return (
            StatusCode::NOT_FOUND,
            Html(views::not_found_page("No such experiment page.")),
        )
            .into_response();
    };

    let mut session = state.sessions.load_or_empty(&jar);

    if fields.get("intent").map(String::as_str) == Some("clear") {
        return match clear_page_memory(state, jar, &mut session, page) {
            Ok(response) => response,
            Err(e) => error_response(page, &e),
        };
    }

    match run_page(state, &mut session, page, fields).await {
        Ok(outcome) => {
            // Stateless pages never touch the session or the cookie
            if page.memory == MemoryStrategy::None {
                return Html(views::experiment_page(
                    page,
                    &[],
                    Some(&outcome.result),
                    None,
                    None,
                ))
                .into_response();
            }

            match state.sessions.commit(&session) {
                Ok(cookie) => (
                    jar.add(cookie),
                    Html(views::experiment_page(
                        page,
                        &outcome.transcript,
                        Some(&outcome.result),
                        outcome.summary.as_deref(),
                        None,
                    )),
                )
                    .into_response(),
                Err(e) => {
                    warn!("Failed to commit session after exchange: {}", e);
                    error_response(page, &e)
                }
            }
        }
        Err(e) => error_response(page, &e),
    }
}

struct PageOutcome {
    result: String,
    transcript: Vec<Turn>,
    summary: Option<String>,
}

async fn run_page(
    state: &AppState,
    session: &mut Session,
    page: &Page,
    fields: &HashMap<String, String>,
) -> Result<PageOutcome> {
    let options = ChatOptions::with_temperature(page.temperature);

    match page.memory {
        MemoryStrategy::None => {
            let rendered = page.render_template(fields);
            let result = match page.section {
                Section::Prompt => state.chat.generate(&rendered, options).await?,
                Section::Chat => {
                    state
                        .chat
                        .chat(&[ChatMessage::user(rendered)], options)
                        .await?
                }
            };
            Ok(PageOutcome {
                result,
                transcript: Vec::new(),
                summary: None,
            })
        }
        MemoryStrategy::Buffer => {
            let input = page.render_template(fields);
            let mut turns = match session.get::<Memory>(&page.memory_key()) {
                Some(Memory::PlainTurns { turns }) => turns,
                _ => Vec::new(),
            };

            let mut messages = memory::to_messages(&turns);
            messages.push(ChatMessage::user(input.clone()));

            let result = state.chat.chat(&messages, options).await?;

            turns.extend(memory::from_exchange(&input, &result));
            session.set(
                &page.memory_key(),
                &Memory::PlainTurns {
                    turns: turns.clone(),
                },
            )?;

            Ok(PageOutcome {
                result,
                transcript: turns,
                summary: None,
            })
        }
        MemoryStrategy::Summary => {
            let input = page.render_template(fields);
            let summary = match session.get::<Memory>(&page.memory_key()) {
                Some(Memory::Summary { summary }) => summary,
                _ => String::new(),
            };

            let prompt = memory::conversation_prompt(&summary, &input);
            let result = state.chat.generate(&prompt, options).await?;

            // One auxiliary call folds the exchange into the stored summary,
            // replacing it
            let fold = memory::summary_prompt(&summary, &memory::exchange_lines(&input, &result));
            let new_summary = state.chat.generate(&fold, options).await?;

            session.set(
                &page.memory_key(),
                &Memory::Summary {
                    summary: new_summary.clone(),
                },
            )?;

            Ok(PageOutcome {
                result,
                transcript: Vec::new(),
                summary: Some(new_summary),
            })
        }
    }
}

fn clear_page_memory(
    state: &AppState,
    jar: SignedCookieJar,
    session: &mut Session,
    page: &Page,
) -> Result<Response> {
    // Clearing stores an empty value; the key stays present
    let empty = match page.memory {
        MemoryStrategy::Summary => Memory::empty_summary(),
        _ => Memory::empty_turns(),
    };
    session.set(&page.memory_key(), &empty)?;

    let cookie = state.sessions.commit(session)?;
    Ok((
        jar.add(cookie),
        Html(views::experiment_page(page, &[], None, None, None)),
    )
        .into_response())
}

fn error_response(page: &Page, e: &PlaygroundError) -> Response {
    warn!("Experiment page '{}' failed: {}", page.slug, e);
    (
        error_status(e),
        Html(views::experiment_page(
            page,
            &[],
            None,
            None,
            Some(&e.to_string()),
        )),
    )
        .into_response()
}

fn stored_memory(session: &Session, page: &Page) -> (Vec<Turn>, Option<String>) {
    match page.memory {
        MemoryStrategy::Buffer => match session.get::<Memory>(&page.memory_key()) {
            Some(Memory::PlainTurns { turns }) => (turns, None),
            _ => (Vec::new(), None),
        },
        MemoryStrategy::Summary => match session.get::<Memory>(&page.memory_key()) {
            Some(Memory::Summary { summary }) => (Vec::new(), Some(summary)),
            _ => (Vec::new(), None),
        },
        MemoryStrategy::None => (Vec::new(), None),
    }
}
