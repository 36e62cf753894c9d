//! Workflow graph and per-query state
//!
//! The graph is fixed: `plan -> router -> {rag_query | generate_questions}`,
//! where the retrieval branch ends immediately and the generation branch
//! always passes through `format_answer`.

use serde::Serialize;

/// Branch chosen for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    GenerateQuestions,
    RagQuery,
}

impl Route {
    /// Questions iff the lowercased input mentions both "generate" and "questions"
    pub fn classify(input: &str) -> Self {
        let lower = input.to_lowercase();
        if lower.contains("generate") && lower.contains("questions") {
            Route::GenerateQuestions
        } else {
            Route::RagQuery
        }
    }
}

/// Workflow node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Plan,
    Router,
    RagQuery,
    GenerateQuestions,
    FormatAnswer,
    Done,
}

impl Node {
    /// Next node after this one has run
    pub fn transition(self, state: &AgentState) -> Node {
        match self {
            Node::Plan => Node::Router,
            Node::Router => match state.route.unwrap_or_else(|| Route::classify(&state.input)) {
                Route::GenerateQuestions => Node::GenerateQuestions,
                Route::RagQuery => Node::RagQuery,
            },
            Node::RagQuery => Node::Done,
            Node::GenerateQuestions => Node::FormatAnswer,
            Node::FormatAnswer | Node::Done => Node::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Node::Done
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Start,
    PlannedRag,
    PlannedQuestions,
    QuestionsGenerated,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolUsed {
    None,
    Rag,
    Questions,
}

/// State threaded through the workflow for one query
#[derive(Debug, Clone, Serialize)]
pub struct AgentState {
    pub input: String,
    pub route: Option<Route>,
    pub current_step: Step,
    pub thoughts: String,
    pub final_answer: String,
    /// Raw question JSON produced by the generation branch
    pub questions: String,
    pub tool_used: ToolUsed,
}

impl AgentState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            route: None,
            current_step: Step::Start,
            thoughts: "Starting to process the query...".to_string(),
            final_answer: String::new(),
            questions: String::new(),
            tool_used: ToolUsed::None,
        }
    }

    /// Append a reasoning note
    pub fn think(&mut self, thought: impl AsRef<str>) {
        self.thoughts.push_str("\n\n");
        self.thoughts.push_str(thought.as_ref());
    }

    /// Record a failure as the final answer
    pub fn fail(&mut self, answer: String) {
        self.final_answer = answer;
        self.current_step = Step::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_requires_both_words() {
        assert_eq!(
            Route::classify("Generate 5 Questions about chess"),
            Route::GenerateQuestions
        );
        assert_eq!(Route::classify("generate a summary"), Route::RagQuery);
        assert_eq!(Route::classify("what questions exist?"), Route::RagQuery);
        assert_eq!(Route::classify(""), Route::RagQuery);
    }

    #[test]
    fn test_graph_paths() {
        let mut state = AgentState::new("explain chess");
        state.route = Some(Route::RagQuery);
        let mut path = vec![Node::Plan];
        let mut node = Node::Plan;
        while !node.is_terminal() {
            node = node.transition(&state);
            path.push(node);
        }
        assert_eq!(path, vec![Node::Plan, Node::Router, Node::RagQuery, Node::Done]);

        state.route = Some(Route::GenerateQuestions);
        assert_eq!(Node::Router.transition(&state), Node::GenerateQuestions);
        assert_eq!(Node::GenerateQuestions.transition(&state), Node::FormatAnswer);
        assert_eq!(Node::FormatAnswer.transition(&state), Node::Done);
    }

    #[test]
    fn test_router_classifies_when_unplanned() {
        let state = AgentState::new("generate questions about rooks");
        assert_eq!(Node::Router.transition(&state), Node::GenerateQuestions);
    }

    #[test]
    fn test_think_appends() {
        let mut state = AgentState::new("q");
        state.think("Planning");
        assert_eq!(state.thoughts, "Starting to process the query...\n\nPlanning");
    }
}
