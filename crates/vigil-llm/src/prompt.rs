//! Prompt text sent to the model.

/// Instructions for the structured extraction call. The user's message is
/// appended after these.
pub const EXTRACTION_INSTRUCTIONS: &str = "\
Extract medical observations from the message below and answer with a single \
JSON object of the form {\"symptoms\": [string], \"vitals\": {string: string}}.
- symptoms: real medical symptoms mentioned in the message, spelling \
corrected. Do not include vitals here.
- vitals: measured vital signs mentioned in the message (e.g. blood pressure, \
heart rate, temperature), keyed by name, with the value as written.
Only report what the message states. Never invent symptoms or vitals. If \
there are none, return empty collections.";

/// The persona and the patient's history, as the system instruction for the
/// conversational call.
pub fn system_prompt(history_context: &str) -> String {
  format!(
    "You are an assistant that helps people maintain a healthy lifestyle and \
     understand their symptoms from the health information they share. If \
     they share no health details, do not press them; talk about their \
     workouts or diet instead. Answer medical questions clearly, gently and \
     concisely.\n\
     Patient context:\n{history_context}\n\
     Check the dates of past symptoms and vitals before relying on them, and \
     only bring up the history when it matters for the follow-up."
  )
}

pub fn extraction_prompt(message: &str) -> String {
  format!("{EXTRACTION_INSTRUCTIONS}\n\nMessage:\n{message}")
}
