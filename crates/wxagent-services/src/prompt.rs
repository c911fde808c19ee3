//! Prompt construction for the narrative model.

use std::fmt::Write as _;

use crate::narrative::{GenerationError, NarrativeRequest};

/// Characters of recent daily data embedded in a prompt.
pub const RECENT_DATA_CHARS: usize = 500;

const ANALYST_ROLE: &str = "You are a professional weather analyst.";

/// Build the model prompt: a general analysis, or an answer to the user's
/// question when one is present.
pub fn build_prompt(request: &NarrativeRequest<'_>) -> Result<String, GenerationError> {
    let statistics = serde_json::to_string_pretty(request.summary)
        .map_err(|e| GenerationError::Prompt(e.to_string()))?;
    let recent = format_recent_data(request, RECENT_DATA_CHARS);

    let context = format!(
        "STATION: {}\nTIME PERIOD: Last {} days\n\nCALCULATED STATISTICS:\n{}\n\nRECENT DAILY DATA:\n{}",
        request.station_id, request.days, statistics, recent
    );

    let prompt = match request.question {
        Some(question) => format!(
            "{ANALYST_ROLE} Answer the following question based on the weather data and statistics:\n\n\
             QUESTION: {question}\n\n\
             {context}\n\n\
             Provide a clear, concise answer (3-4 sentences) with specific numbers from the data."
        ),
        None => format!(
            "{ANALYST_ROLE} Analyze the following weather data and statistics:\n\n\
             {context}\n\n\
             Provide a concise professional weather analysis covering:\n\
             1. Current temperature conditions and comparison to average\n\
             2. Any anomalies or unusual patterns (use z-score and changes)\n\
             3. Overall weather trends\n\
             4. Brief forecast implications\n\n\
             Keep your response to 4-5 sentences, be specific with numbers."
        ),
    };

    Ok(prompt)
}

/// One line per observation, newest first, cut to at most `max_chars`
/// characters with a trailing `...` when anything was dropped.
pub fn format_recent_data(request: &NarrativeRequest<'_>, max_chars: usize) -> String {
    let mut out = String::new();
    for obs in request.observations.iter().rev() {
        let _ = write!(out, "{}: {:.1}°C", obs.date, obs.temperature_c);
        if let Some(p) = obs.precip_mm {
            let _ = write!(out, ", precip {:.1} mm", p);
        }
        if let Some(w) = obs.wind_speed_kmh {
            let _ = write!(out, ", wind {:.1} km/h", w);
        }
        out.push('\n');
    }

    match out.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            out.truncate(cut);
            out.push_str("...");
            out
        }
        None => out.trim_end().to_string(),
    }
}
