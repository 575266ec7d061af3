//! Canonical agent specializations.
//!
//! Each specialization is a data entry: name, routing keywords, expertise
//! tags, and a system prompt. Adding an expert means adding a spec here.

use std::sync::Arc;

use crate::agents::{Agent, AgentRequest, AgentResponse, BaseAgent};
use crate::llm::LLMClient;
use crate::types::Result;
use async_trait::async_trait;

/// The closed set of shipped specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Market,
    Regulatory,
    Tech,
    Trends,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Market,
        AgentKind::Regulatory,
        AgentKind::Tech,
        AgentKind::Trends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Market => "market",
            AgentKind::Regulatory => "regulatory",
            AgentKind::Tech => "tech",
            AgentKind::Trends => "trends",
        }
    }
}

struct AgentSpec {
    name: &'static str,
    keywords: &'static [&'static str],
    expertise: &'static [&'static str],
    prompt: &'static str,
}

fn spec_for(kind: AgentKind) -> &'static AgentSpec {
    match kind {
        AgentKind::Market => &MARKET_SPEC,
        AgentKind::Regulatory => &REGULATORY_SPEC,
        AgentKind::Tech => &TECH_SPEC,
        AgentKind::Trends => &TRENDS_SPEC,
    }
}

static MARKET_SPEC: AgentSpec = AgentSpec {
    name: "market-analyst",
    keywords: &[
        "market",
        "revenue",
        "valuation",
        "competitors",
        "growth",
        "investment",
        "funding",
    ],
    expertise: &[
        "market size analysis",
        "competitive landscape",
        "M&A activity",
        "investment trends",
        "revenue forecasting",
    ],
    prompt: "You are a market analysis expert for the financial technology industry.\n\n\
Your specialization:\n\
- Market sizing and segmentation\n\
- Competitive landscape assessment\n\
- M&A activity and deals\n\
- Investment trends and funding rounds\n\
- Revenue and growth forecasting\n\n\
When analyzing, focus on:\n\
1. Concrete numbers and data points\n\
2. Citing sources as [S1], [S2], etc.\n\
3. Comparison against competitors\n\
4. Growth trends\n\n\
Always end your answer with a section:\n\
Insights:\n\
- Key insight 1\n\
- Key insight 2\n\
- Key insight 3",
};

static REGULATORY_SPEC: AgentSpec = AgentSpec {
    name: "regulatory-expert",
    keywords: &[
        "regulation",
        "compliance",
        "license",
        "law",
        "legal",
        "GDPR",
        "PSD2",
    ],
    expertise: &[
        "regulatory compliance",
        "licensing requirements",
        "legal frameworks",
        "GDPR and data protection",
        "PSD2 and open banking",
        "central bank regulations",
    ],
    prompt: "You are an expert on regulatory and legal aspects of the financial technology industry.\n\n\
Your specialization:\n\
- Legislation and regulatory frameworks\n\
- Licensing of financial activity\n\
- Compliance requirements\n\
- GDPR and personal data protection\n\
- PSD2 and open banking\n\
- Central bank requirements\n\n\
When analyzing, focus on:\n\
1. Specific laws and regulations\n\
2. Regulator requirements\n\
3. Non-compliance risks\n\
4. Practical recommendations\n\n\
Cite sources as [S1], [S2], etc.\n\n\
Always end your answer with a section:\n\
Insights:\n\
- Key insight 1\n\
- Key insight 2\n\
- Key insight 3",
};

static TECH_SPEC: AgentSpec = AgentSpec {
    name: "tech-specialist",
    keywords: &[
        "API",
        "integration",
        "security",
        "blockchain",
        "infrastructure",
        "protocol",
    ],
    expertise: &[
        "API design and integration",
        "security architecture",
        "blockchain technology",
        "infrastructure planning",
        "protocol implementation",
    ],
    prompt: "You are an expert on technical aspects of the financial technology industry.\n\n\
Your specialization:\n\
- API design and integrations\n\
- Security and cryptography\n\
- Blockchain and distributed systems\n\
- Infrastructure and scaling\n\
- Protocols and standards\n\n\
When analyzing, focus on:\n\
1. Implementation details\n\
2. Architectural decisions\n\
3. Security considerations\n\
4. Integration patterns\n\n\
Cite sources as [S1], [S2], etc.\n\n\
Always end your answer with a section:\n\
Insights:\n\
- Key insight 1\n\
- Key insight 2\n\
- Key insight 3",
};

static TRENDS_SPEC: AgentSpec = AgentSpec {
    name: "trends-analyst",
    keywords: &[
        "trend",
        "startup",
        "innovation",
        "future",
        "emerging",
        "AI",
        "machine learning",
    ],
    expertise: &[
        "startup ecosystem",
        "innovation trends",
        "emerging technologies",
        "AI and machine learning",
        "future of fintech",
    ],
    prompt: "You are an expert on innovation and trends in the financial technology industry.\n\n\
Your specialization:\n\
- Startup ecosystem analysis\n\
- New technology trends\n\
- AI and machine learning in fintech\n\
- Emerging technologies\n\
- Industry outlook\n\n\
When analyzing, focus on:\n\
1. The newest technologies and approaches\n\
2. Promising startups\n\
3. Development trends\n\
4. Expert forecasts\n\n\
Cite sources as [S1], [S2], etc.\n\n\
Always end your answer with a section:\n\
Insights:\n\
- Key insight 1\n\
- Key insight 2\n\
- Key insight 3",
};

/// A canonical specialist built from its spec table entry.
pub struct SpecializedAgent {
    inner: BaseAgent,
}

impl SpecializedAgent {
    pub fn new(kind: AgentKind, llm: Arc<dyn LLMClient>) -> Self {
        let spec = spec_for(kind);
        Self {
            inner: BaseAgent::new(
                spec.name,
                spec.expertise.iter().map(|s| s.to_string()).collect(),
                spec.keywords.iter().map(|s| s.to_string()).collect(),
                spec.prompt,
                llm,
            ),
        }
    }
}

#[async_trait]
impl Agent for SpecializedAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn expertise(&self) -> &[String] {
        self.inner.expertise()
    }

    fn can_handle(&self, question: &str) -> f64 {
        self.inner.can_handle(question)
    }

    async fn process(&self, req: &AgentRequest) -> Result<AgentResponse> {
        self.inner.process(req).await
    }
}
