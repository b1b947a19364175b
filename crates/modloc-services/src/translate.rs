use crate::batch::read_manifest;
use crate::{LocaleMap, Result, Session};
use color_eyre::eyre::eyre;
use modloc_config::TranslatorSettings;
use modloc_domain::TranslateSummary;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::time::Duration;
use tracing::{info, warn};

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?(.*?)```").unwrap());

/// The external translation collaborator. Takes the fixed instruction and a
/// key→source-text payload, returns translations keyed identically (a subset
/// is tolerated).
pub trait Translator {
    fn translate(&self, instruction: &str, payload: &LocaleMap) -> Result<LocaleMap>;
}

/// Fixed instruction sent with every work unit. Keeps the constraints the
/// output format depends on: placeholders, format codes, identifiers, strict
/// JSON keyed like the input.
pub fn translation_instruction(source_lang: &str, target_lang: &str) -> String {
    format!(
        "You are a professional translator for Minecraft mod text. Translate the \
values of the following JSON object from the `{source_lang}` locale into the \
`{target_lang}` locale.\n\
Rules:\n\
1. Use the terminology established by the game's official `{target_lang}` localization.\n\
2. Keep every placeholder (%s, %d, %1$s, ...) and formatting code (\u{a7}a, \u{a7}b, ...) exactly as written.\n\
3. Keep key names unchanged; translate values only.\n\
4. Do not translate proper nouns, commands or identifiers; leave anything you are unsure about in the source language.\n\
5. Reply with the translated JSON object and nothing else."
    )
}

/// Strip a ```json fenced block when the model wraps its reply in one.
pub fn strip_code_fence(content: &str) -> &str {
    match CODE_FENCE_RE.captures(content) {
        Some(caps) => caps.get(1).map_or(content, |m| m.as_str().trim()),
        None => content.trim(),
    }
}

fn parse_reply(content: &str) -> Result<LocaleMap> {
    let body = strip_code_fence(content);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| eyre!("reply is not valid JSON: {e}"))?;
    let obj = value
        .as_object()
        .ok_or_else(|| eyre!("reply is not a JSON object"))?;
    let mut map = LocaleMap::with_capacity(obj.len());
    for (k, v) in obj {
        if let Some(s) = v.as_str() {
            map.insert(k.clone(), s.to_string());
        }
    }
    Ok(map)
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiTranslator {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model_id: String,
}

impl OpenAiTranslator {
    pub fn new(settings: &TranslatorSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("modloc/cli")
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model_id: settings.model_id.clone(),
        })
    }
}

impl Translator for OpenAiTranslator {
    fn translate(&self, instruction: &str, payload: &LocaleMap) -> Result<LocaleMap> {
        #[derive(serde::Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            temperature: f32,
            response_format: serde_json::Value,
        }
        #[derive(serde::Deserialize)]
        struct Choice {
            message: ReplyMessage,
        }
        #[derive(serde::Deserialize)]
        struct ReplyMessage {
            content: String,
        }
        #[derive(serde::Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        let user_content = format!(
            "{instruction}\n\nInput JSON:\n{}",
            serde_json::to_string_pretty(payload)?
        );
        let resp: Response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&Request {
                model: &self.model_id,
                messages: vec![
                    Message {
                        role: "system",
                        content: "You translate Minecraft mod locale files and reply with JSON only.",
                    },
                    Message {
                        role: "user",
                        content: &user_content,
                    },
                ],
                // Low temperature keeps terminology consistent across units.
                temperature: 0.2,
                response_format: serde_json::json!({"type": "json_object"}),
            })
            .send()?
            .error_for_status()?
            .json()?;

        let content = resp
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| eyre!("response carried no choices"))?;
        parse_reply(content)
    }
}

/// Walk the manifest and translate every work file that has no result yet.
///
/// Per work file: an existing result counts as done without a call; a failed
/// call is logged and counted, never fatal; a blocking pause of `delay`
/// follows every live call. Re-running the driver is the retry mechanism.
pub fn run_driver(
    session: &Session,
    translator: &dyn Translator,
    delay: Duration,
) -> Result<TranslateSummary> {
    let manifest = read_manifest(session)?;
    if manifest.paths.is_empty() {
        return Err(eyre!("manifest lists no paths to translate"));
    }

    let instruction = translation_instruction(&session.source_lang, &session.target_lang);
    let mut summary = TranslateSummary::default();

    for entry in &manifest.paths {
        info!(path = %entry.path, mods = ?entry.mods, files = entry.split_files.len(), "translating path");
        let source_dir = session.batch_dir().join(&entry.path);
        let target_dir = session.results_dir().join(&entry.path);
        fs::create_dir_all(&target_dir)?;

        for file_name in &entry.split_files {
            summary.total_files += 1;
            let source_file = source_dir.join(file_name);
            let target_file = target_dir.join(file_name);

            if target_file.is_file() {
                // Idempotent resume: an existing result is final for this run.
                summary.skipped_files += 1;
                summary.done_files += 1;
                if let Ok(bytes) = fs::read(&target_file) {
                    if let Ok(existing) = serde_json::from_slice::<LocaleMap>(&bytes) {
                        summary.translated_keys += existing.len();
                    }
                }
                info!(file = %file_name, "result already present, skipped");
                continue;
            }
            if !source_file.is_file() {
                warn!(file = %source_file.display(), "work file missing");
                summary.failed_files += 1;
                continue;
            }
            let payload: LocaleMap = match serde_json::from_slice(&fs::read(&source_file)?) {
                Ok(map) => map,
                Err(e) => {
                    warn!(file = %source_file.display(), error = %e, "unreadable work file");
                    summary.failed_files += 1;
                    continue;
                }
            };
            if payload.is_empty() {
                warn!(file = %file_name, "empty work file");
                summary.failed_files += 1;
                continue;
            }
            summary.total_keys += payload.len();

            match translator.translate(&instruction, &payload) {
                Ok(translated) => {
                    fs::write(&target_file, serde_json::to_string_pretty(&translated)?)?;
                    summary.done_files += 1;
                    summary.translated_keys += translated.len();
                    info!(file = %file_name, keys = translated.len(), "translated work file");
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "translation failed");
                    summary.failed_files += 1;
                }
            }
            std::thread::sleep(delay);
        }
    }

    info!(
        total = summary.total_files,
        done = summary.done_files,
        failed = summary.failed_files,
        skipped = summary.skipped_files,
        "translation pass finished"
    );
    Ok(summary)
}
