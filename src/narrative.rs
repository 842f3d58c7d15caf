use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::NarrativeError;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Turns a serialized history summary into a free-text report.
pub trait Narrator {
    fn narrate(&self, summary_csv: &str) -> Result<String, NarrativeError>;
}

/// Builds the report prompt around a `URL,Date,Visit Count` table.
pub fn build_prompt(summary_csv: &str) -> String {
    format!(
        r#"**Digital Behavior Analysis - Psychological and Productivity Profile**

**Context:** You are a digital behavior analyst and organizational psychologist. Analyze the browsing history below, which belongs to an anonymous user, and write a detailed, structured report in Markdown.

**Note:** The data has been pre-processed and aggregated. Each line is the total number of visits to **one domain on one day**.
- `URL` is the main domain (e.g. `https://www.youtube.com`).
- `Date` is the day the visits happened.
- `Visit Count` is the **total number of visits to that domain on that day**.
Take this summarized structure into account when inferring usage patterns.

**Browsing history (summarized per day):**
```
{summary_csv}
```

**Requested report structure:**

**1. Main interests**
   - **Personal:** hobbies, curiosities and leisure topics (e.g. youtube.com, netflix.com, x.com).
   - **Professional:** fields of study, technologies, tools and work-related subjects (e.g. github.com, stackoverflow.com, documentation sites).

**2. Inferred psychological profile**
   - **Personality traits:** traits suggested by the sites visited (e.g. curiosity, pragmatism, creativity, discipline).
   - **Cognitive and emotional preferences:** analytical or intuitive? Quick answers or deep study? Any signs of seeking well-being or stress relief through entertainment?

**3. Digital behavior pattern**
   - **Daily activity peaks:** which days have the highest `Visit Count`.
   - **Focus vs. dispersion:** how many different domains are visited on the same day.
   - **Procrastination signals:** days with high counts on both productivity and leisure or social sites.

**4. Information sources and consumption style**
   - **Favorite sources:** the domains with the highest total `Visit Count` across all days.
   - **Style:** video, long-form text or quick answers from forums?

**5. Learning and reasoning profile**
   - How does the user seem to learn and solve problems: tutorials, official documentation, practical examples or theoretical discussion?

**6. Risks and strengths**
   - **Risks:** information overload, tendency to distraction, unreliable sources.
   - **Strengths:** self-directed learning, interest in best practices, continuous development.

**7. Psychological dossier (summary)**
   - One paragraph summarizing the user's profile as a concise dossier.

**8. Actionable recommendations**
   - **For the user (performance and well-being):** productivity tips, healthier digital habits, generic posture and ergonomics advice.
   - **For an observer or HR (workplace improvement):** generic, non-identifying insights on how the workplace could better support people.

**Output format:** strictly Markdown, with headings, lists and bold text for clarity.
"#
    )
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, NarrativeError> {
        Self::with_timeout(api_key, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NarrativeError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(NarrativeError::MissingApiKey);
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NarrativeError::Client)?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Reads the key from `GOOGLE_API_KEY` and the model from `GEMINI_MODEL`.
    pub fn from_env() -> Result<Self, NarrativeError> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| NarrativeError::MissingApiKey)?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_key, model)
    }

    /// Points the client at a proxy or test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl Narrator for GeminiClient {
    fn narrate(&self, summary_csv: &str) -> Result<String, NarrativeError> {
        let start_time = Instant::now();
        info!(action = "start", component = "narrative", model = %self.model, "Requesting analysis");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&build_prompt(summary_csv)))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(action = "request", component = "narrative", status = status.as_u16(), "Model request rejected");
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json()?;
        let text = response_text(&body).ok_or(NarrativeError::EmptyResponse)?;

        info!(
            action = "complete",
            component = "narrative",
            response_chars = text.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Analysis received"
        );
        Ok(text)
    }
}

fn request_body(prompt: &str) -> Value {
    json!({ "contents": [{ "parts": [{ "text": prompt }] }] })
}

/// Joins the text parts of the first candidate.
fn response_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
