use leptos::prelude::*;

use crate::components::diagram::{
	AnnotatedDiagram, AnnotationMap, DiagramConfig, DiagramError, GraphSpec, SvgDiagram,
	parse_flowchart,
};

const WORKFLOW: &str = r#"flowchart TD
  Start(["200 concepts enumerated"]):::blue --> Found["Identify foundational concepts\n(10-15 marked)"]:::blue
  Found --> Chain["Map sequential chains\n(+30-40 edges)"]:::green
  Chain --> Conv["Map convergent dependencies\n(+40-60 edges)"]:::green
  Conv --> Trans["Remove transitive redundancies\n(-10-20 edges)"]:::orange
  Trans --> Dag{"DAG validation:\ncycles detected?"}:::purple
  Dag -->|Yes| Fix["Resolve cycles\n(split/primacy)"]:::purple
  Fix --> Dag
  Dag -->|No| Strength["Validate dependency strengths\n(-5-10 weak edges)"]:::orange
  Strength --> End(["Valid DAG\n(180-220 dependencies)"]):::green

  classDef blue fill:#3b82f6,stroke:#1e3a8a,color:#fff
  classDef green fill:#22c55e,stroke:#166534,color:#fff
  classDef orange fill:#f97316,stroke:#9a3412,color:#fff
  classDef purple fill:#8b5cf6,stroke:#5b21b6,color:#fff
  linkStyle default stroke:#1f2937,stroke-width:2px
"#;

const WORKFLOW_NOTES: &[(&str, &str)] = &[
	("Start", "Start with flat list of 200 concepts."),
	("Found", "Mark foundational concepts (zero dependencies)."),
	("Chain", "Add sequential A->B->C chains."),
	("Conv", "Add convergent prerequisites A->C<-B."),
	("Trans", "Remove transitive redundancies (A->C when A->B->C exists)."),
	("Dag", "Validate DAG and detect cycles."),
	("Fix", "Resolve cycles by splitting or setting primacy."),
	("Strength", "Validate dependency strength and remove weak edges."),
	("End", "Target output: valid DAG with ~180-220 edges."),
];

const DECISION_TREE: &str = r#"flowchart TD
  Q1{"Need multiple sequential steps?"}:::d -->|No| Cmd(["Use a Command"]):::cmd
  Q1 -->|Yes| Q2{"Need read/write\nmultiple files?"}:::d
  Q2 -->|No| Cmd
  Q2 -->|Yes| Q3{"Need validation or\nerror handling?"}:::d
  Q3 -->|No| Simple(["Simple Skill\nmight work"]):::mid
  Q3 -->|Yes| Q4{"Reused across\nmultiple projects?"}:::d
  Q4 -->|Yes| Full(["Create a Skill\nwith full workflow"]):::skill
  Q4 -->|No| Local(["Project-local\nSkill or Command"]):::mid

  classDef d fill:#fde047,stroke:#713f12,color:#111827
  classDef skill fill:#16a34a,stroke:#14532d,color:#fff
  classDef cmd fill:#eab308,stroke:#92400e,color:#111827
  classDef mid fill:#f97316,stroke:#9a3412,color:#fff
"#;

const DECISION_NOTES: &[(&str, &str)] = &[
	("Q1", "If the task has multiple sequential steps, a Skill is often better."),
	("Q2", "Cross-file read/write workflows are a strong Skill signal."),
	("Q3", "Validation, retries, and guardrails usually require workflow logic."),
	("Q4", "Reusable cross-project workflows should become Skills."),
	("Cmd", "Use Commands for simple prompt templates and one-shot actions."),
	("Simple", "Simple Skill can fit lightweight repeatable multi-step tasks."),
	("Full", "Create a full Skill for robust, reusable workflows."),
	("Local", "Use project-local Skill or command for single-project automation."),
];

fn notes(entries: &[(&str, &str)]) -> AnnotationMap {
	entries.iter().copied().collect()
}

fn flowchart(src: &str) -> Result<GraphSpec, DiagramError> {
	Ok(parse_flowchart(src)?)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let workflow = flowchart(WORKFLOW);
	let decisions = flowchart(DECISION_TREE);
	let workflow_config = DiagramConfig {
		panel_follows_pointer: true,
		..DiagramConfig::default()
	};
	let decision_config = DiagramConfig {
		default_text: "Hover a node for guidance.".into(),
		..DiagramConfig::default()
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<main class="diagram-page">
				<section class="diagram-card">
					<h2>"Dependency Mapping Workflow"</h2>
					{workflow.map(|spec| view! {
						<AnnotatedDiagram
							spec=Signal::stored(spec)
							annotations=Signal::stored(notes(WORKFLOW_NOTES))
							config=Signal::stored(workflow_config)
							title="Workflow Notes"
							height=Some(640.0)
						/>
					})}
				</section>
				<section class="diagram-card">
					<h2>"Skills vs Commands"</h2>
					{decisions.map(|spec| view! {
						<SvgDiagram
							spec=Signal::stored(spec)
							annotations=Signal::stored(notes(DECISION_NOTES))
							config=decision_config
							title="Decision Notes"
						/>
					})}
				</section>
				<p>
					<a href="/learning-graph">"Learning graph from data.json"</a>
				</p>
			</main>
		</ErrorBoundary>
	}
}
