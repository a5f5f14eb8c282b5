use async_trait::async_trait;
use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{ApiError, CaptionTrack, TrackList, TranscriptApi, TranscriptSegment, TranslationLanguage};
use crate::Result;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const INNERTUBE_API_URL: &str = "https://www.youtube.com/youtubei/v1/player?key=";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// Transcript API client speaking to YouTube's public endpoints
pub struct YoutubeTranscriptApi {
    client: Client,
    cookies: Arc<Jar>,
}

impl YoutubeTranscriptApi {
    pub fn new() -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US"),
        );

        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(cookies.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, cookies })
    }

    async fn fetch_video_html(&self, video_id: &str) -> std::result::Result<String, ApiError> {
        let url = format!("{}{}", WATCH_URL, urlencoding::encode(video_id));
        let html = self.get_text(&url, video_id).await?;

        if !html.contains("action=\"https://consent.youtube.com/s\"") {
            return Ok(html);
        }

        tracing::debug!("Answering consent page for {}", video_id);
        self.create_consent_cookie(&html, video_id)?;

        let html = self.get_text(&url, video_id).await?;
        if html.contains("action=\"https://consent.youtube.com/s\"") {
            return Err(ApiError::ConsentFailed(video_id.to_string()));
        }

        Ok(html)
    }

    fn create_consent_cookie(&self, html: &str, video_id: &str) -> std::result::Result<(), ApiError> {
        static CONSENT_RE: OnceLock<Regex> = OnceLock::new();
        let re = CONSENT_RE.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid regex"));

        let value = re
            .captures(html)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| ApiError::ConsentFailed(video_id.to_string()))?;

        let origin = url::Url::parse("https://www.youtube.com")
            .map_err(|e| ApiError::Http(e.to_string()))?;
        self.cookies.add_cookie_str(
            &format!("CONSENT=YES+{}; Domain=.youtube.com; Path=/", value.as_str()),
            &origin,
        );

        Ok(())
    }

    async fn fetch_innertube_data(&self, video_id: &str, api_key: &str) -> std::result::Result<Value, ApiError> {
        let url = format!("{}{}", INNERTUBE_API_URL, api_key);
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to fetch InnerTube data: {}", e)))?;

        check_status(&response, video_id)?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to parse InnerTube response: {}", e)))
    }

    async fn get_text(&self, url: &str, video_id: &str) -> std::result::Result<String, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("GET {} failed: {}", url, e)))?;

        check_status(&response, video_id)?;

        response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to read response body: {}", e)))
    }
}

#[async_trait]
impl TranscriptApi for YoutubeTranscriptApi {
    async fn list_tracks(&self, video_id: &str) -> std::result::Result<TrackList, ApiError> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;
        let data = self.fetch_innertube_data(video_id, &api_key).await?;
        parse_track_list(video_id, &data)
    }

    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        translate_to: Option<&str>,
    ) -> std::result::Result<Vec<TranscriptSegment>, ApiError> {
        let mut url = track.base_url.clone();
        if let Some(target) = translate_to {
            url = format!("{}&tlang={}", url, urlencoding::encode(target));
        }

        if url.contains("&exp=xpe") {
            return Err(ApiError::PoTokenRequired(track.video_id.clone()));
        }

        tracing::debug!(
            "Fetching {} track for {} (translate_to: {:?})",
            track.language_code,
            track.video_id,
            translate_to
        );

        let xml = self.get_text(&url, &track.video_id).await?;
        Ok(parse_timedtext(&xml))
    }
}

fn check_status(response: &Response, video_id: &str) -> std::result::Result<(), ApiError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::IpBlocked(video_id.to_string()));
    }

    if !response.status().is_success() {
        return Err(ApiError::Http(format!(
            "HTTP {}: {}",
            response.status(),
            response.status().canonical_reason().unwrap_or("Unknown error")
        )));
    }

    Ok(())
}

fn extract_innertube_api_key(html: &str, video_id: &str) -> std::result::Result<String, ApiError> {
    static API_KEY_RE: OnceLock<Regex> = OnceLock::new();

    if html.contains("class=\"g-recaptcha\"") {
        return Err(ApiError::IpBlocked(video_id.to_string()));
    }

    let re = API_KEY_RE
        .get_or_init(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid regex"));

    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ApiError::Unparsable(video_id.to_string()))
}

fn assert_playability(video_id: &str, data: &Value) -> std::result::Result<(), ApiError> {
    let Some(playability) = data.get("playabilityStatus") else {
        return Ok(());
    };

    let status = playability["status"].as_str().unwrap_or("");
    if status == "OK" {
        return Ok(());
    }

    let reason = playability["reason"].as_str().unwrap_or("");
    match status {
        "LOGIN_REQUIRED" if reason.contains("not a bot") => {
            Err(ApiError::RequestBlocked(video_id.to_string()))
        }
        "LOGIN_REQUIRED" if reason.contains("inappropriate") => {
            Err(ApiError::AgeRestricted(video_id.to_string()))
        }
        "ERROR" if reason.contains("unavailable") => {
            Err(ApiError::VideoUnavailable(video_id.to_string()))
        }
        _ => Err(ApiError::VideoUnplayable(video_id.to_string(), reason.to_string())),
    }
}

fn first_run_text(value: &Value) -> Option<&str> {
    value
        .get("runs")
        .and_then(|runs| runs.as_array())
        .and_then(|runs| runs.first())
        .and_then(|run| run.get("text"))
        .and_then(|text| text.as_str())
        .or_else(|| value.get("simpleText").and_then(|text| text.as_str()))
}

/// Build the track list from a player response
fn parse_track_list(video_id: &str, data: &Value) -> std::result::Result<TrackList, ApiError> {
    assert_playability(video_id, data)?;

    let captions = data
        .get("captions")
        .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
        .ok_or_else(|| ApiError::TranscriptsDisabled(video_id.to_string()))?;

    let translation_languages: Vec<TranslationLanguage> = captions["translationLanguages"]
        .as_array()
        .map(|langs| {
            langs
                .iter()
                .filter_map(|lang| {
                    let language_code = lang["languageCode"].as_str()?.to_string();
                    let language = first_run_text(&lang["languageName"])
                        .unwrap_or(&language_code)
                        .to_string();
                    Some(TranslationLanguage {
                        language,
                        language_code,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let tracks: Vec<CaptionTrack> = captions["captionTracks"]
        .as_array()
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|caption| {
                    let language_code = caption["languageCode"].as_str()?.to_string();
                    let base_url = caption["baseUrl"].as_str()?.replace("&fmt=srv3", "");
                    let language = first_run_text(&caption["name"])
                        .unwrap_or(&language_code)
                        .to_string();
                    let is_translatable = caption["isTranslatable"].as_bool().unwrap_or(false);

                    Some(CaptionTrack {
                        video_id: video_id.to_string(),
                        language,
                        language_code,
                        is_generated: caption["kind"].as_str() == Some("asr"),
                        is_translatable,
                        base_url,
                        translation_languages: if is_translatable {
                            translation_languages.clone()
                        } else {
                            Vec::new()
                        },
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(ApiError::TranscriptsDisabled(video_id.to_string()));
    }

    Ok(TrackList {
        video_id: video_id.to_string(),
        tracks,
    })
}

/// Parse `<text start=".." dur="..">..</text>` elements of a timed-text document
fn parse_timedtext(xml: &str) -> Vec<TranscriptSegment> {
    static TEXT_RE: OnceLock<Regex> = OnceLock::new();
    static ATTR_RE: OnceLock<Regex> = OnceLock::new();

    let text_re = TEXT_RE
        .get_or_init(|| Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("valid regex"));
    let attr_re = ATTR_RE.get_or_init(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("valid regex"));

    text_re
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let mut start = None;
            let mut duration = 0.0;
            for attr in attr_re.captures_iter(attrs) {
                match &attr[1] {
                    "start" => start = attr[2].parse::<f64>().ok(),
                    "dur" => duration = attr[2].parse::<f64>().unwrap_or(0.0),
                    _ => {}
                }
            }

            let raw = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let text = strip_tags(&decode_entities(raw));

            Some(TranscriptSegment {
                text,
                start: start?,
                duration,
            })
        })
        .collect()
}

/// Timed-text bodies are escaped twice (`&amp;#39;`), so decode twice
fn decode_entities(input: &str) -> String {
    let once = html_escape::decode_html_entities(input);
    html_escape::decode_html_entities(&once).into_owned()
}

fn strip_tags(input: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));
    re.replace_all(input, "").into_owned()
}
