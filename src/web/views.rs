//! Server-rendered HTML for the experiment pages. Plain string building;
//! the markup is deliberately minimal.

use itertools::Itertools;

use crate::indexer::CollectionRecord;
use crate::memory::{Speaker, Turn};

use super::pages::{MemoryStrategy, Page, Section, PAGES};

/// Escape text for safe interpolation into HTML
#[inline]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[inline]
pub fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{} — LLM Playground</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }}\n\
         label {{ display: block; font-weight: bold; margin-top: 0.75rem; }}\n\
         input[type=text], select {{ width: 100%; padding: 0.3rem; }}\n\
         button {{ margin-top: 1rem; padding: 0.4rem 1.2rem; }}\n\
         .error {{ color: #b00020; border: 1px solid #b00020; padding: 0.5rem; margin: 1rem 0; }}\n\
         .notice {{ color: #1a6b2f; border: 1px solid #1a6b2f; padding: 0.5rem; margin: 1rem 0; }}\n\
         .transcript {{ border: 1px solid #888; padding: 0.5rem; margin: 1rem 0; max-height: 20rem; overflow-y: auto; }}\n\
         .human {{ color: #000; }}\n\
         .assistant {{ color: #1a46b0; }}\n\
         table {{ border-collapse: collapse; margin: 1rem 0; }}\n\
         td, th {{ border: 1px solid #888; padding: 0.3rem 0.7rem; text-align: left; }}\n\
         </style>\n</head>\n<body>\n{}\n<p><a href=\"/\">Home</a></p>\n</body>\n</html>",
        escape(title),
        body
    )
}

fn banner(error: Option<&str>, notice: Option<&str>) -> String {
    let mut html = String::new();
    if let Some(message) = error {
        html.push_str(&format!("<div class=\"error\">{}</div>\n", escape(message)));
    }
    if let Some(message) = notice {
        html.push_str(&format!("<div class=\"notice\">{}</div>\n", escape(message)));
    }
    html
}

#[inline]
pub fn home_page() -> String {
    let mut body = String::from("<h1>LLM Playground</h1>\n<p>Experiments that forward form input to a language model.</p>\n");

    for (section, pages) in &PAGES.iter().chunk_by(|p| p.section) {
        let heading = match section {
            Section::Prompt => "Prompts",
            Section::Chat => "Chat",
        };
        body.push_str(&format!("<h2>{}</h2>\n<ul>\n", heading));
        for page in pages {
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a> — {}</li>\n",
                page.path(),
                escape(page.title),
                escape(page.blurb)
            ));
        }
        body.push_str("</ul>\n");
    }

    body.push_str(
        "<h2>Documents</h2>\n<ul>\n\
         <li><a href=\"/documents\">Upload &amp; index</a> — chunk and embed a text file</li>\n\
         <li><a href=\"/documents/qa\">Document Q&amp;A</a> — one-shot questions over an indexed document</li>\n\
         <li><a href=\"/documents/chat\">Conversational Q&amp;A</a> — document questions with conversation memory</li>\n\
         </ul>\n\
         <h2>Agents</h2>\n<ul>\n\
         <li><a href=\"/agents\">Agent experiments</a> — not supported</li>\n\
         </ul>\n",
    );

    layout("Home", &body)
}

#[inline]
pub fn agents_page() -> String {
    let body = "<h1>Agent experiments</h1>\n\
        <p>The search agent, plan-and-execute agent, and AutoGPT experiments \
        are not supported in this playground. The upstream experiments were \
        left unfinished, and no guessed implementation is provided here.</p>";
    layout("Agents", body)
}

/// Form page for a table-driven prompt or chat experiment
#[inline]
pub fn experiment_page(
    page: &Page,
    transcript: &[Turn],
    result: Option<&str>,
    memory_summary: Option<&str>,
    error: Option<&str>,
) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n{}",
        escape(page.title),
        escape(page.blurb),
        banner(error, None)
    );

    if !transcript.is_empty() {
        body.push_str("<div class=\"transcript\">\n");
        for turn in transcript {
            let class = match turn.speaker {
                Speaker::Human => "human",
                Speaker::Assistant => "assistant",
            };
            body.push_str(&format!(
                "<div class=\"{}\">{}: {}</div>\n",
                class,
                class,
                escape(&turn.text)
            ));
        }
        body.push_str("</div>\n");
    }

    if let Some(summary) = memory_summary {
        if !summary.is_empty() {
            body.push_str(&format!(
                "<p><em>Conversation summary:</em> {}</p>\n",
                escape(summary)
            ));
        }
    }

    if let Some(result) = result {
        body.push_str(&format!("<p><strong>Result:</strong> {}</p>\n", escape(result)));
    }

    body.push_str(&format!("<form method=\"post\" action=\"{}\">\n", page.path()));
    for input in page.inputs {
        body.push_str(&format!(
            "<label for=\"{name}\">{label}</label>\n\
             <input id=\"{name}\" name=\"{name}\" type=\"text\" required>\n",
            name = input.name,
            label = escape(input.label)
        ));
    }
    body.push_str("<button type=\"submit\" name=\"intent\" value=\"submit\">Submit</button>\n");
    if page.memory != MemoryStrategy::None {
        body.push_str("<button type=\"submit\" name=\"intent\" value=\"clear\">Clear conversation</button>\n");
    }
    body.push_str("</form>\n");

    layout(page.title, &body)
}

fn collections_table(collections: &[CollectionRecord]) -> String {
    if collections.is_empty() {
        return "<p>No documents indexed yet.</p>\n".to_string();
    }

    let mut html = String::from(
        "<table>\n<thead><tr><th>Name</th><th>Chunks</th><th>Location</th></tr></thead>\n<tbody>\n",
    );
    for record in collections {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&record.name),
            record.chunk_count,
            escape(&record.location)
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn collection_select(collections: &[CollectionRecord], selected: Option<&str>) -> String {
    let mut html = String::from(
        "<label for=\"document\">Document</label>\n<select id=\"document\" name=\"document\" required>\n",
    );
    for record in collections {
        let marker = if selected == Some(record.location.as_str()) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            escape(&record.location),
            marker,
            escape(&record.name)
        ));
    }
    html.push_str("</select>\n");
    html
}

#[inline]
pub fn documents_page(
    collections: &[CollectionRecord],
    notice: Option<&str>,
    error: Option<&str>,
) -> String {
    let body = format!(
        "<h1>Document embedding</h1>\n\
         <p>Upload a plain-text file (.txt, .md; at most 5&nbsp;MB) to chunk, embed, and index.</p>\n\
         {}\
         <form method=\"post\" action=\"/documents\" enctype=\"multipart/form-data\">\n\
         <label for=\"file\">File</label>\n\
         <input id=\"file\" name=\"file\" type=\"file\" accept=\".txt, .md, .text\" required>\n\
         <button type=\"submit\">Upload and index</button>\n\
         </form>\n\
         <h2>Indexed documents</h2>\n{}",
        banner(error, notice),
        collections_table(collections)
    );
    layout("Documents", &body)
}

#[inline]
pub fn qa_page(
    collections: &[CollectionRecord],
    answer: Option<&str>,
    error: Option<&str>,
) -> String {
    let mut body = format!(
        "<h1>Document Q&amp;A</h1>\n\
         <p>Ask a one-shot question over an indexed document.</p>\n{}",
        banner(error, None)
    );

    if let Some(answer) = answer {
        body.push_str(&format!("<p><strong>Answer:</strong> {}</p>\n", escape(answer)));
    }

    if collections.is_empty() {
        body.push_str("<p>No documents indexed yet. <a href=\"/documents\">Upload one first.</a></p>\n");
    } else {
        body.push_str("<form method=\"post\" action=\"/documents/qa\">\n");
        body.push_str(&collection_select(collections, None));
        body.push_str(
            "<label for=\"question\">Question</label>\n\
             <input id=\"question\" name=\"question\" type=\"text\" required>\n\
             <button type=\"submit\">Ask</button>\n</form>\n",
        );
    }

    layout("Document Q&A", &body)
}

#[inline]
pub fn document_chat_page(
    collections: &[CollectionRecord],
    transcript: &[Turn],
    selected: Option<&str>,
    error: Option<&str>,
) -> String {
    let mut body = format!(
        "<h1>Conversational document Q&amp;A</h1>\n\
         <p>Ask follow-up questions over an indexed document; the conversation \
         is kept in your session.</p>\n{}",
        banner(error, None)
    );

    if !transcript.is_empty() {
        body.push_str("<div class=\"transcript\">\n");
        for turn in transcript {
            let class = match turn.speaker {
                Speaker::Human => "human",
                Speaker::Assistant => "assistant",
            };
            body.push_str(&format!(
                "<div class=\"{}\">{}: {}</div>\n",
                class,
                class,
                escape(&turn.text)
            ));
        }
        body.push_str("</div>\n");
    }

    if collections.is_empty() {
        body.push_str("<p>No documents indexed yet. <a href=\"/documents\">Upload one first.</a></p>\n");
    } else {
        body.push_str("<form method=\"post\" action=\"/documents/chat\">\n");
        body.push_str(&collection_select(collections, selected));
        body.push_str(
            "<label for=\"question\">Question</label>\n\
             <input id=\"question\" name=\"question\" type=\"text\" required>\n\
             <button type=\"submit\" name=\"intent\" value=\"submit\">Ask</button>\n\
             <button type=\"submit\" name=\"intent\" value=\"clear\">Clear conversation</button>\n\
             </form>\n",
        );
    }

    layout("Conversational Q&A", &body)
}

#[inline]
pub fn not_found_page(what: &str) -> String {
    layout(
        "Not found",
        &format!("<h1>Not found</h1>\n<p>{}</p>", escape(what)),
    )
}
