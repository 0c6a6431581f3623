//! Prompt construction for the AI engine adapters.
//!
//! Each engine gets a role-specific prompt assembled from the same
//! request context, so the four results complement rather than repeat
//! each other.

use persuade_core::ProviderRequest;

/// Persuasive-content prompt for the content engine.
pub fn content(request: &ProviderRequest) -> String {
    format!(
        "Create persuasive marketing content for a {} business ({}) targeting {}.\n\
         Audience: {}\n\
         Objective: {}\n\n\
         Please provide:\n\
         1. A compelling headline\n\
         2. Main persuasive message (2-3 sentences)\n\
         3. Call-to-action\n\
         4. Key emotional triggers\n\
         5. Social proof suggestions\n\n\
         Format as JSON with keys: headline, message, cta, triggers, social_proof",
        request.business_name,
        request.industry,
        request.audience_name,
        request.audience_description,
        request.objective,
    )
}

/// Market-research prompt for the research engine.
pub fn research(request: &ProviderRequest) -> String {
    format!(
        "Research and analyze the latest trends and data for {} businesses targeting {}.\n\
         Focus on: {}\n\n\
         Provide:\n\
         1. Current market trends\n\
         2. Competitor analysis insights\n\
         3. Audience behavior patterns\n\
         4. Effective messaging strategies\n\
         5. Supporting statistics and data\n\n\
         Format as detailed research report.",
        request.industry, request.audience_name, request.objective,
    )
}

/// Persuasion-analysis prompt for the analysis engine.
pub fn analysis(request: &ProviderRequest) -> String {
    format!(
        "Analyze the cognitive persuasion strategy for a {} business ({}) targeting {}.\n\
         Audience: {}\n\
         Objective: {}\n\n\
         Provide a comprehensive analysis including:\n\
         1. Psychological triggers most effective for this audience\n\
         2. Cognitive biases to leverage\n\
         3. Persuasion frameworks (AIDA, PAS, etc.)\n\
         4. Emotional appeals and rational arguments balance\n\
         5. Specific messaging recommendations\n\
         6. Potential objections and how to address them\n\n\
         Be specific and actionable.",
        request.business_name,
        request.industry,
        request.audience_name,
        request.audience_description,
        request.objective,
    )
}

/// Campaign-strategy prompt for the strategy engine.
pub fn strategy(request: &ProviderRequest) -> String {
    format!(
        "Create a comprehensive persuasion strategy for a {} business ({}) targeting {}.\n\
         Objective: {}\n\n\
         Generate:\n\
         1. Multi-channel campaign strategy\n\
         2. Visual content recommendations\n\
         3. Video script outline\n\
         4. Social media post variations\n\
         5. Email marketing sequence\n\
         6. Landing page copy structure\n\n\
         Consider both visual and textual elements for maximum impact.",
        request.business_name, request.industry, request.audience_name, request.objective,
    )
}
