//! Prompt construction for the research agent.

use chrono::Local;

/// The product capability catalog every answer is grounded in.
pub const SOLUTION_CATALOG: &[&str] = &[
    "GPS Fleet Tracking & Real-time Visibility",
    "Route Optimization & Fuel Management",
    "Driver Behavior Monitoring & Safety",
    "Maintenance Management & Scheduling",
    "ELD Compliance & Hours of Service",
    "Dispatch & Load Optimization",
    "Cost Analytics & Reporting",
];

/// System instructions for the research agent, including the JSON tool-call
/// protocol the bounded loop parses.
pub fn build_agent_instructions(tool_names: &[String]) -> String {
    let tools = if tool_names.is_empty() {
        "None (answer from your own knowledge)".to_string()
    } else {
        tool_names.join(", ")
    };

    format!(
        "You are a friendly sales agent for Fleetworthy, a fleet management software company.\n\
Your style: conversational, helpful, and concise. Think of this as a casual business chat, not a formal presentation.\n\
\n\
Available Fleetworthy Solutions:\n{catalog}\n\
\n\
Response format:\n\
- Keep it conversational and brief (2-4 sentences maximum)\n\
- Focus on 1-2 key benefits that match the customer's business\n\
- Include one specific benefit (like \"15% fuel savings\")\n\
- End with a friendly next step suggestion\n\
\n\
You have access to the following tools: {tools}.\n\
When you need to use a tool, respond ONLY with JSON in this format:\n\
{{\"type\":\"tool_call\",\"tool_name\":\"<tool>\",\"tool_args\":{{...}}}}\n\
When you have the final answer, respond ONLY with JSON in this format:\n\
{{\"type\":\"final\",\"content\":\"...\"}}\n\
Do not include any extra text outside the JSON.\n\
Current datetime: {now}",
        catalog = SOLUTION_CATALOG
            .iter()
            .map(|solution| format!("- {}", solution))
            .collect::<Vec<_>>()
            .join("\n"),
        tools = tools,
        now = Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

/// User prompt for company research mode.
pub fn company_research_prompt(website: &str, description: &str) -> String {
    format!(
        "Research this company and provide a brief, conversational response:\n\
\n\
Company Website: {website}\n\
Company Description: {description}\n\
\n\
Research steps:\n\
1. Search for basic info about this company's transportation/logistics operations\n\
2. If a website is provided, fetch key details about their business\n\
3. Identify 1-2 main challenges they likely face\n\
4. Suggest relevant Fleetworthy solutions in 2-3 friendly sentences\n\
5. Store key findings in memory\n\
\n\
Response style: casual and conversational, like a friendly business chat.\n\
Length: 2-4 sentences maximum.\n\
Focus: one key benefit that matches their specific business needs.",
    )
}

/// User prompt for question research mode.
pub fn question_research_prompt(
    question: &str,
    company_website: Option<&str>,
    company_description: Option<&str>,
) -> String {
    let context_info = match (company_website, company_description) {
        (None, None) => String::new(),
        (website, description) => format!(
            "\nCompany context - Website: {}, Description: {}",
            website.unwrap_or(""),
            description.unwrap_or("")
        ),
    };

    format!(
        "A potential customer asked: \"{question}\"{context_info}\n\
\n\
Provide a brief, helpful response:\n\
1. Search for relevant industry information if needed\n\
2. Give a conversational answer about Fleetworthy solutions\n\
3. Keep it to 2-4 sentences maximum\n\
4. Include one specific benefit or statistic\n\
5. Store any useful findings in memory\n\
\n\
Response style: friendly and conversational, not a formal sales pitch.\n\
Focus: a direct answer to their question with one relevant Fleetworthy solution.",
    )
}
