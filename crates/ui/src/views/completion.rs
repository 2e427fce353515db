use dioxus::prelude::*;

use crate::vm::CompletionVm;

#[component]
pub fn CompletionPanel(completion: CompletionVm) -> Element {
    rsx! {
        div { class: "survey-complete",
            h3 { class: "survey-complete__title", "Thank you!" }
            p { class: "survey-complete__subtitle", "You finished {completion.title}." }
            dl { class: "summary",
                dt { "Answered" }
                dd { "{completion.answered}" }

                dt { "Skipped" }
                dd { "{completion.skipped}" }

                dt { "Started" }
                dd { "{completion.started_at_str}" }

                dt { "Completed" }
                dd { "{completion.completed_at_str}" }

                dt { "Time taken" }
                dd { "{completion.duration_str}" }
            }
        }
    }
}
