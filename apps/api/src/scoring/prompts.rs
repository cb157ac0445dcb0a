// Fit scoring LLM prompt templates.

pub const FIT_SCORE_PROMPT_TEMPLATE: &str = r#"You are a senior technical talent scout. Rate how well this person fits the job below.

JOB TITLE: {role_title}
SEARCH KEYWORDS: {keywords}

CANDIDATE PROFILE:
- Name: {display_name}
- Bio: {bio}
- Followers: {followers}
- Recent activity: {recent_activity}

WEIGH THESE SIGNALS:
1. Technical-skill match: does the bio or activity mention the keywords or closely related technologies?
2. Seniority and experience: titles like Senior, Staff, Lead; shipped production systems; architecture or scaling work.
3. Profile completeness: a specific bio and substantive recent activity beat vague or empty ones.
4. Role relevance: is this person actually doing the kind of work the job needs?

SCORE BANDS:
- 90-100: exceptional match, strong senior signals directly on the role
- 70-89: good match, relevant technologies with some experience signals
- 50-69: moderate match, tangential or early-career signals
- 0-49: poor match, off-topic, spam, or bot-like

Return ONLY this JSON object, as the entire response:
{"score": <integer 0-100>, "reasoning": "<one sentence>"}"#;
