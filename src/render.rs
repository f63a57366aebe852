//! HTML views. Every interpolated string goes through [`esc`].

use chrono::NaiveDateTime;
use quick_xml::escape::escape;
use std::fmt::Write;

use crate::normalize::{FieldGroup, LineItemRow, CONFIDENCE_LABEL, LINE_ITEM_COLUMNS};
use crate::types::DocumentType;

const PICO_CSS: &str = "https://cdn.jsdelivr.net/npm/@picocss/pico@latest/css/pico.min.css";
const HTMX_JS: &str = "https://unpkg.com/htmx.org@2.0.3/dist/htmx.min.js";
pub const ACCEPTED_FILES: &str = ".png, .jpg, .jpeg, .JPG, .pdf";

fn esc(s: &str) -> String {
    escape(s).into_owned()
}

/// Full HTML document with the page title repeated as the main heading.
pub fn page(title: &str, body: &str) -> String {
    let title = esc(title);
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"{PICO_CSS}\">\n\
         <style>:root {{ --pico-font-size: 100%; }}</style>\n\
         <script src=\"{HTMX_JS}\"></script>\n\
         </head>\n<body>\n<main class=\"container\">\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n"
    )
}

pub fn upload_form() -> String {
    let mut options = String::new();
    for t in DocumentType::ALL {
        let _ = write!(
            options,
            "<option value=\"{}\">{}</option>",
            t.as_str(),
            esc(t.label())
        );
    }
    format!(
        "<form enctype=\"multipart/form-data\" hx-post=\"/process\" hx-swap=\"afterend\" hx-indicator=\"#processing\">\
         <h3>Upload a file to be processed by Typless:</h3>\
         <fieldset role=\"group\" style=\"display: flex; justify-content: space-between; align-items: center; width: 60%;\">\
         <input type=\"file\" name=\"file\" accept=\"{ACCEPTED_FILES}\" required style=\"max-width: 50%;\">\
         <p>Select the type of document:</p>\
         <select name=\"doc_type\" required style=\"max-width: 25%\">{options}</select>\
         </fieldset>\
         <button>Process</button>\
         <p id=\"processing\" class=\"htmx-indicator\">Processing...</p>\
         </form>"
    )
}

pub fn index_page() -> String {
    page("DigitalCarBook intake", &upload_form())
}

fn field_group(group: &FieldGroup) -> String {
    let mut rows = String::new();
    for row in &group.rows {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td></tr>",
            esc(&row.value),
            esc(&row.confidence)
        );
    }
    format!(
        "<fieldset role=\"group\" style=\"margin-bottom: 20px;\">\
         <table style=\"width: 100%; border-collapse: collapse;\">\
         <tr><th><h5>{}</h5></th><th>{CONFIDENCE_LABEL}</th></tr>{rows}</table></fieldset>",
        esc(&group.name)
    )
}

/// Line item table; the header row is always present.
fn line_items(rows: &[LineItemRow]) -> String {
    let mut html = String::from("<table style=\"width: 100%; border-collapse: collapse;\"><tr>");
    for (_, label) in LINE_ITEM_COLUMNS {
        let _ = write!(html, "<th>{}</th>", esc(label));
    }
    html.push_str("</tr>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row.cells() {
            let _ = write!(html, "<td>{}</td>", esc(&cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// Everything the result card shows.
pub struct ResultView<'a> {
    pub filename: &'a str,
    pub doc_type: DocumentType,
    pub fields: &'a [FieldGroup],
    pub line_items: &'a [LineItemRow],
    /// JSON payload posted back to `/save`.
    pub doc_json: &'a str,
    pub uploaded_at: NaiveDateTime,
}

pub fn result_card(view: &ResultView<'_>) -> String {
    let fields: String = view.fields.iter().map(field_group).collect();
    format!(
        "<form hx-post=\"/save\" hx-target=\"#save_button\" hx-swap=\"outerHTML\" hx-indicator=\"true\">\
         <article>\
         <header>Document uploaded successfully ✅</header>\
         <h2>{filename}</h2>\
         <p>Content type: {doc_type}</p>\
         <h3>Extracted fields:</h3>\
         <div>{fields}</div>\
         <h3>Line items:</h3>\
         <div>{items}</div>\
         <button id=\"save_button\">Save</button>\
         <input type=\"hidden\" name=\"doc\" value=\"{doc}\">\
         <footer>Uploaded at: {at}</footer>\
         </article></form>",
        filename = esc(view.filename),
        doc_type = view.doc_type.as_str(),
        items = line_items(view.line_items),
        doc = esc(view.doc_json),
        at = view.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Card shown when Typless rejects the upload; `message` is the raw response body.
pub fn error_card(message: &str) -> String {
    format!(
        "<article>\
         <header>Error ❌</header>\
         <h2>Failed to process the file</h2>\
         <p>An error occurred while processing the file. Please try again later.</p>\
         <p>Error message from Typless:</p>\
         <div>{}</div>\
         </article>",
        esc(message)
    )
}

pub fn saved_button() -> String {
    "<button disabled>Saved</button>".to_string()
}

pub fn not_found_page() -> String {
    page("Oh no!", "<div>We could not find that page :(</div>")
}
