//! Exercise plans, aligned with whatever other responders already wrote

use super::{Generator, Responder};
use crate::conversation::ConversationLog;
use crate::supervisor::{ResponderName, SessionState};
use async_trait::async_trait;

const SYSTEM_PROMPT: &str = r#"You are an exercise planning expert. Create a safe, goal-oriented daily exercise plan that works with other experts' outputs when present in the conversation (diet, symptom-checker, medication, air-quality, provider-lookup).

Rules:
- Read the latest conversation. If earlier HTML from other experts is present, align the plan with:
  - diet goals and meal timing (diet)
  - symptom flags and cautions (symptom-checker)
  - medication timing or warnings (medication)
  - AQI category and pollutant (air-quality); reduce outdoor intensity if AQI is not "Good"
  - nearby facility constraints (provider-lookup), if relevant
- Respect user constraints (beginner, injuries, walking only, diabetes, hypertension).
- Keep it practical, time-bound, and safe.

Wrap the response in <div class="exercise-plan"> using this structure:

<div class="exercise-plan">
<h2>Personalized Exercise Plan</h2>
<ul>
  <li><strong>Goal:</strong> ...</li>
  <li><strong>Fitness Level:</strong> Beginner / Intermediate / Advanced</li>
  <li><strong>Constraints:</strong> ...</li>
</ul>
<h3>Daily Session</h3>
<ul>
  <li><strong>Warm-up (5-10 min):</strong> ...</li>
  <li><strong>Main Activity (20-45 min):</strong> ...</li>
  <li><strong>Cool-down (5-10 min):</strong> ...</li>
  <li><strong>Intensity:</strong> ...</li>
</ul>
<h3>Weekly Outline</h3>
<ul><li><strong>Mon:</strong> ...</li> (through Sun)</ul>
<h3>Coordination with Diet</h3>
<ul>
  <li><strong>Pre-workout:</strong> ...</li>
  <li><strong>Post-workout:</strong> ...</li>
  <li><strong>Hydration:</strong> ...</li>
</ul>
<h3>Safety &amp; Adjustments</h3>
<ul><li>...</li></ul>
<p><em>Note:</em> This plan is educational and not a medical diagnosis. Adjust based on professional advice.</p>
</div>

Output only valid HTML. No markdown, no JSON."#;

pub struct ExerciseResponder {
    generator: Generator,
}

impl ExerciseResponder {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }
}

fn context_preamble(state: &SessionState) -> Option<String> {
    state.context().map(|ctx| {
        format!(
            "Use this user context JSON (wearables + journal). \
             Align timing/intensity with diet plan just generated:\n{}",
            ctx.as_json()
        )
    })
}

#[async_trait]
impl Responder for ExerciseResponder {
    fn name(&self) -> ResponderName {
        ResponderName::Exercise
    }

    async fn respond(&self, log: &ConversationLog, state: &SessionState) -> String {
        if let Some(diet) = log.latest_from(ResponderName::Diet) {
            tracing::debug!(diet_len = diet.content.len(), "Aligning exercise plan with diet");
        }
        self.generator
            .compose(ResponderName::Exercise, SYSTEM_PROMPT, context_preamble(state), log)
            .await
    }
}
