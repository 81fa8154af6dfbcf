//! Daily diet plans

use super::{Generator, Responder};
use crate::conversation::ConversationLog;
use crate::supervisor::{ResponderName, SessionState};
use async_trait::async_trait;

const SYSTEM_PROMPT: &str = r#"You are a personalized diet planning expert focused on creating healthy, balanced, and goal-oriented meal plans.

Generate a complete daily diet plan in HTML based on the user's profile, preferences, health conditions, and goals (weight loss, diabetes-friendly, vegetarian, high-protein, and so on).

Wrap the response in a <div class="diet-plan"> block using this structure:

<div class="diet-plan">
<h2>Personalized Diet Plan</h2>
<ul>
<li><strong>Goal:</strong> [Weight loss / Gain / Diabetes-friendly / etc.]</li>
<li><strong>Total Calories:</strong> [1200 kcal / 1500 kcal / etc.]</li>
</ul>

<h3>Breakfast</h3>
<ul>
<li><strong>Time:</strong> 8:00 AM</li>
<li><strong>Items:</strong> Oats porridge with nuts, 1 boiled egg, 1 apple</li>
<li><strong>Calories:</strong> 350 kcal</li>
</ul>

<h3>Mid-Morning Snack</h3>
<h3>Lunch</h3>
<h3>Evening Snack</h3>
<h3>Dinner</h3>
(each with the same Time / Items / Calories list)

<h3>Notes</h3>
<ul>
<li>Hydration target</li>
<li>Foods to avoid</li>
<li>Activity reminder</li>
</ul>
</div>

Customize meals and notes for health goals, dietary preference (veg/non-veg), and special needs (diabetic, hypothyroid, gluten-free).
Use only div, ul, li, strong, h2, h3 and p tags. No markdown, no JSON, no plain text outside the HTML."#;

pub struct DietResponder {
    generator: Generator,
}

impl DietResponder {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }
}

/// Context message placed ahead of the conversation
fn context_preamble(state: &SessionState) -> Option<String> {
    state.context().map(|ctx| {
        format!(
            "Use this user context JSON (wearables + journal) to tailor the plan:\n{}",
            ctx.as_json()
        )
    })
}

#[async_trait]
impl Responder for DietResponder {
    fn name(&self) -> ResponderName {
        ResponderName::Diet
    }

    async fn respond(&self, log: &ConversationLog, state: &SessionState) -> String {
        self.generator
            .compose(ResponderName::Diet, SYSTEM_PROMPT, context_preamble(state), log)
            .await
    }
}
