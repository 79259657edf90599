// Prompt composition for a single planning iteration

use crate::providers::ChatMessage;
use crate::prompts::SystemPrompts;
use crate::scope::Scope;

pub const NO_PREVIOUS_PLAN: &str = "(none yet)";
pub const NO_FEEDBACK: &str = "(no feedback yet)";

/// Inputs gathered from storage for one iteration.
#[derive(Debug, Clone)]
pub struct PlanContext<'a> {
    pub scope: Scope,
    pub goals: &'a str,
    pub previous_plan: &'a str,
    pub feedback: &'a str,
}

/// Build the user payload: tagged sections followed by fixed output instructions.
pub fn compose_user_payload(ctx: &PlanContext<'_>) -> String {
    let previous = non_empty_or(ctx.previous_plan, NO_PREVIOUS_PLAN);
    let feedback = non_empty_or(ctx.feedback, NO_FEEDBACK);

    format!(
        "[GOAL_SCOPE]\n{scope}\n\n\
         [GOALS]\n{goals}\n\n\
         [PREVIOUS_PLAN]\n{previous}\n\n\
         [FEEDBACK_FROM_USER]\n{feedback}\n\n\
         [INSTRUCTIONS]\n\
         - Focus ONLY on the goals text above.\n\
         - Output markdown with sections:\n  \
           - Path to completion\n  \
           - Steps (numbered)\n  \
           - Summary\n",
        scope = ctx.scope,
        goals = ctx.goals.trim(),
    )
}

/// Full message sequence: planner instruction, persona (when present), payload.
pub fn compose_messages(prompts: &SystemPrompts, ctx: &PlanContext<'_>) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(prompts.planner_or_default())];
    if !prompts.persona_general.trim().is_empty() {
        messages.push(ChatMessage::system(prompts.persona_general.clone()));
    }
    messages.push(ChatMessage::user(compose_user_payload(ctx)));
    messages
}

fn non_empty_or<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}
