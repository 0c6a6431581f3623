//! Deterministic mock payloads.
//!
//! Mock payloads are pure functions of the request: no randomness, no
//! clock reads. Two identical requests always produce identical payloads,
//! which keeps demo accounts and tests reproducible.

use persuade_core::ProviderRequest;
use serde_json::{json, Value};

/// Mock payload for the content engine.
#[must_use]
pub fn content(request: &ProviderRequest) -> Value {
    json!({
        "content": {
            "headline": format!("Transform Your {} Business Today!", request.industry),
            "message": format!(
                "Discover how our proven strategies help {} achieve remarkable results. \
                 Join thousands who have already transformed their success.",
                request.audience_name
            ),
            "cta": "Get Started Now - Limited Time Offer!",
            "triggers": ["urgency", "social_proof", "transformation"],
            "social_proof": format!("Over 10,000 {} trust our solutions", request.audience_name),
        },
        "source": "mock",
    })
}

/// Mock payload for the research engine.
#[must_use]
pub fn research(request: &ProviderRequest) -> Value {
    json!({
        "research": format!(
            "Market Research Report for {} targeting {}:\n\n\
             1. Current Trends: Growing demand for personalized solutions\n\
             2. Competitor Analysis: Focus on value proposition and customer service\n\
             3. Audience Behavior: Prefer authentic, transparent communication\n\
             4. Effective Messaging: Emphasize benefits over features\n\
             5. Statistics: 73% of consumers prefer brands that understand their needs",
            request.industry, request.audience_name
        ),
        "citations": [],
        "source": "mock",
    })
}

/// Mock payload for the analysis engine.
#[must_use]
pub fn analysis(request: &ProviderRequest) -> Value {
    json!({
        "analysis": format!(
            "Cognitive Persuasion Analysis for {}:\n\n\
             1. Psychological Triggers: Social proof, authority, scarcity\n\
             2. Cognitive Biases: Anchoring, loss aversion, confirmation bias\n\
             3. Framework: AIDA (Attention, Interest, Desire, Action)\n\
             4. Emotional Balance: 60% emotional appeal, 40% rational arguments\n\
             5. Key Messages: Focus on transformation and results\n\
             6. Objections: Address price concerns with value demonstration",
            request.industry
        ),
        "model": "claude-3-sonnet",
        "source": "mock",
    })
}

/// Mock payload for the strategy engine.
#[must_use]
pub fn strategy(request: &ProviderRequest) -> Value {
    json!({
        "strategy": format!(
            "Multi-Channel Strategy for {}:\n\n\
             1. Campaign Strategy: Integrated approach across digital channels\n\
             2. Visual Content: Professional imagery with consistent branding\n\
             3. Video Script: Problem-solution narrative with testimonials\n\
             4. Social Media: Platform-specific content with engagement focus\n\
             5. Email Sequence: Welcome, education, social proof, offer\n\
             6. Landing Page: Clear headline, benefits, testimonials, strong CTA",
            request.industry
        ),
        "model": "gemini-pro",
        "source": "mock",
    })
}

/// Mock payload for a Twitter audience analysis.
#[must_use]
pub fn twitter(request: &ProviderRequest) -> Value {
    json!({
        "data": {
            "tweets": [],
            "total_found": 0,
            "keywords": request.audience_name,
            "sentiment": "neutral",
            "engagement_level": "medium",
        },
        "source": "mock",
    })
}

/// Mock payload for a LinkedIn professional search.
#[must_use]
pub fn linkedin(request: &ProviderRequest) -> Value {
    json!({
        "data": {
            "profiles": [],
            "total_found": 0,
            "keywords": request.audience_name,
            "company_filter": Value::Null,
            "insights": {
                "common_titles": [],
                "locations": [],
            },
        },
        "source": "mock",
    })
}

/// Mock payload for a YouTube content analysis.
#[must_use]
pub fn youtube(request: &ProviderRequest) -> Value {
    json!({
        "data": {
            "videos": [],
            "total_found": 0,
            "query": request.audience_name,
            "insights": {
                "popular_channels": [],
                "avg_views": 0,
            },
        },
        "source": "mock",
    })
}

/// Mock payload for a Reddit community analysis.
#[must_use]
pub fn reddit(request: &ProviderRequest) -> Value {
    json!({
        "data": {
            "posts": [],
            "subreddit": subreddit_for(request),
            "total_posts": 0,
            "insights": {
                "hot_topics": [],
                "avg_engagement": 0,
            },
        },
        "source": "mock",
    })
}

/// Derive a subreddit name from the request's industry.
#[must_use]
pub fn subreddit_for(request: &ProviderRequest) -> String {
    request
        .industry
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            business_name: "Acme Coffee".into(),
            industry: "Food & Beverage".into(),
            audience_name: "remote workers".into(),
            audience_description: "laptop-bound professionals".into(),
            objective: "drive subscriptions".into(),
            demo: true,
        }
    }

    #[test]
    fn mock_payloads_are_deterministic() {
        let r = request();
        assert_eq!(content(&r), content(&r));
        assert_eq!(research(&r), research(&r));
        assert_eq!(twitter(&r), twitter(&r));
        assert_eq!(reddit(&r), reddit(&r));
    }

    #[test]
    fn subreddit_strips_non_alphanumerics() {
        assert_eq!(subreddit_for(&request()), "foodbeverage");
    }

    #[test]
    fn payloads_embed_request_fields() {
        let r = request();
        assert!(content(&r)["content"]["headline"]
            .as_str()
            .unwrap()
            .contains("Food & Beverage"));
        assert_eq!(twitter(&r)["data"]["keywords"], "remote workers");
    }
}
