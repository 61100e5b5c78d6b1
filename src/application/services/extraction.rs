use chrono::Utc;
use tracing::instrument;

use crate::domain::{
    parse_records, ports::LlmService, DomainError, ExtractedRecord, ExtractionReport, StatusLog,
};
use crate::infrastructure::PromptsConfig;

/// Page-by-page structured extraction with the extraction prompt.
pub struct ExtractionService {
    prompts: PromptsConfig,
}

impl ExtractionService {
    pub fn new(prompts: PromptsConfig) -> Self {
        Self { prompts }
    }

    /// Runs extraction over `pages`. Failures on one page are recorded as
    /// warnings; credential problems abort the run.
    #[instrument(skip(self, llm, pages, status), fields(pages = pages.len()))]
    pub async fn run(
        &self,
        llm: &dyn LlmService,
        document: &str,
        pages: &[String],
        status: &StatusLog,
    ) -> Result<ExtractionReport, DomainError> {
        let extraction = &self.prompts.extraction;
        let total = pages.len();
        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut succeeded = 0;

        for (idx, text) in pages.iter().enumerate() {
            let page = idx + 1;
            status.set_progress(idx as f32 / total.max(1) as f32);

            if text.trim().is_empty() {
                succeeded += 1;
                continue;
            }

            status.info(format!("Extracting data from page {page}/{total}"));
            let response = match llm.complete(&self.prompts.extraction_prompt(text)).await {
                Ok(response) => response,
                Err(e @ (DomainError::Authentication(_) | DomainError::MissingCredentials(_))) => {
                    return Err(e)
                }
                Err(e) => {
                    let warning = format!("Error extracting from page {page}: {e}");
                    status.warn(warning.clone());
                    warnings.push(warning);
                    continue;
                }
            };

            match parse_records(&response, &extraction.marker_field, &extraction.example_marker) {
                Ok(found) => {
                    succeeded += 1;
                    records.extend(found.into_iter().map(|fields| ExtractedRecord { page, fields }));
                }
                Err(e) => {
                    let warning = format!("Failed to parse JSON from page {page}: {e}");
                    status.warn(warning.clone());
                    warnings.push(warning);
                }
            }
        }

        status.set_progress(1.0);
        status.success(format!(
            "Extraction complete: {succeeded}/{total} pages processed, {} records",
            records.len()
        ));

        Ok(ExtractionReport {
            document: document.to_string(),
            pages_total: total,
            pages_succeeded: succeeded,
            records,
            warnings,
            completed_at: Utc::now(),
        })
    }
}
