//! Fixed customer-facing replies.

pub const CLOSING: &str =
    "You're welcome! If you need further assistance, feel free to reach out. Have a great day!";
pub const SENTIMENT_ESCALATION: &str = "We're sorry you're having difficulties. We've escalated your issue to a human agent who will contact you shortly.";
pub const UNCLASSIFIED: &str =
    "I'm not sure how to handle this request. I'll escalate it to a human agent.";

pub const TECHNICAL_RESOLVED: &str = "Great! Let me know if you need anything else.";
pub const TECHNICAL_ESCALATION: &str =
    "I've escalated this to our technical team. They'll contact you shortly.";
pub const TECHNICAL_NO_SOLUTION: &str = "Thanks for your query. I couldn't find an immediate solution. I've escalated this to our technical team.";

pub const SALES_COMPLEX: &str =
    "Your inquiry requires personalized attention. We've escalated it to our sales team.";

pub const FEATURE_LOGGED: &str =
    "Thank you for your suggestion! We've logged your feature request.";
pub const FEATURE_UPDATED: &str = "I've updated your feature request with additional details.";

pub fn sales_recorded(name: &str, company: &str, team_size: &str) -> String {
    format!(
        "Thanks {name} from {company} with a team of {team_size}.\nWe've recorded your query and our sales team will reach out to you shortly."
    )
}
