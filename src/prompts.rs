//! Prompt construction for batch extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the extraction contract (classify each
//!    page, extract all key-value pairs, keep labels consistent with prior
//!    batches, return only the new batch's findings) lives in exactly one
//!    place.
//!
//! 2. **Testability** — unit tests can inspect the generated instruction
//!    text without invoking a model.
//!
//! The instruction embeds the accumulated prior analysis as a fenced JSON
//! block. Passing the running context forward is what lets the model reuse
//! an existing sub-document label ("Lab Results") for page 12 when pages 4–6
//! already used it, instead of inventing "Laboratory Findings".

use crate::pipeline::render::PageImage;

/// One element of the ordered content sequence sent to the model:
/// instruction text, a page marker, or a page image.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text(String),
    Image(PageImage),
}

/// Marker inserted before each page image so the model can tell which
/// attachment belongs to which page number.
pub fn page_marker(page: u32) -> String {
    format!("--- Image for Page {page} ---")
}

/// Build the instruction text for one batch.
///
/// `prior_context` is the accumulator serialised as JSON (`{}` for the first
/// batch). The reply contract: one JSON object for the current batch only,
/// keys are sub-document types, values are lists of per-page records, each
/// record carries `page_number`, blank pages get a minimal record with a
/// status note.
pub fn extraction_instructions(
    document_type: &str,
    insurance_type: &str,
    pages: &[u32],
    prior_context: &str,
) -> String {
    let page_list = format_page_list(pages);
    format!(
        r#"You are an underwriting assistant analyzing pages {page_list} from a document submission.
The overall document has been classified as: {document_type}
The insurance type is: {insurance_type}

Analysis of previous pages (if any):
```json
{prior_context}
```

**Your Task:**
1. For each new page image provided in this batch, perform two tasks:
    a. **Classify the page**: Identify a specific sub-document type for the page (e.g., "Applicant Information", "Medical History", "Attending Physician Statement", "Lab Results", "Prescription History").
    b. **Extract all data**: Extract all key-value pairs of information from the page.
2. **Structure your output**: Group the extracted data for each page under its classified sub-document type.
3. **Maintain Consistency**: If a page's type matches a key from the "Analysis of previous pages", you will group it with those pages. If it's a new type, you will create a new key.
4. **Return ONLY a JSON object** that contains the analysis for the **CURRENT BATCH of pages**. Do not repeat the previous analysis in your output.

**Important Guidelines:**
- The keys in your JSON output should be the sub-document types.
- The values should be a list of page objects.
- Each page object must include a `"page_number"` and all other data you extracted.
- If a page is blank or contains no extractable information, return an object with just the page number and a note, like `{{"page_number": 1, "status": "No information found"}}`.
- Do not include any explanations or text outside of the final JSON object.

**Example Output Format:**
```json
{{
  "Applicant Information": [
    {{
      "page_number": 1,
      "full_name": "John Doe",
      "date_of_birth": "1980-01-15",
      "address": "123 Main St, Anytown, USA"
    }}
  ],
  "Medical History": [
    {{
      "page_number": 2,
      "condition": "Hypertension",
      "diagnosed_date": "2015-06-20",
      "treatment": "Lisinopril"
    }}
  ]
}}
```

Here come the images for pages {page_list}:
"#
    )
}

/// Assemble the full content-part sequence for a batch: the instruction
/// text, then an alternating run of page markers and page images in
/// ascending page order.
pub fn build_batch_parts(instructions: String, images: Vec<PageImage>) -> Vec<PromptPart> {
    let mut parts = Vec::with_capacity(1 + images.len() * 2);
    parts.push(PromptPart::Text(instructions));
    for image in images {
        parts.push(PromptPart::Text(page_marker(image.page)));
        parts.push(PromptPart::Image(image));
    }
    parts
}

fn format_page_list(pages: &[u32]) -> String {
    let rendered: Vec<String> = pages.iter().map(u32::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
