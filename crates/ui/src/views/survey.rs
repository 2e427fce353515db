use dioxus::prelude::*;

use crate::context::AppContext;
use crate::views::{CompletionPanel, ViewError, ViewState, view_state_from_resource};
use crate::vm::{SelectionEdit, SurveyIntent, WidgetVm, open_survey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LastAction {
    Load,
    Submit,
    Skip,
}

#[component]
pub fn SurveyView() -> Element {
    let ctx = use_context::<AppContext>();
    let session_loop = ctx.session_loop();
    let survey_id = ctx.survey_id();

    let vm = use_signal({
        let session_loop = session_loop.clone();
        move || open_survey(&session_loop, survey_id)
    });
    let error = use_signal(|| None::<ViewError>);
    let busy = use_signal(|| false);
    let last_action = use_signal(|| None::<LastAction>);

    let handle = use_hook(|| vm.peek().handle().clone());
    use_drop(move || {
        let _ = handle.dispose();
    });

    let session_loop_for_resource = session_loop.clone();
    let resource = use_resource(move || {
        let session_loop = session_loop_for_resource.clone();
        let mut vm = vm;
        let mut last_action = last_action;

        async move {
            last_action.set(Some(LastAction::Load));
            let mut local = vm.peek().clone();
            let result = local.load(&session_loop).await;
            vm.set(local);
            result
        }
    });

    let dispatch_intent = {
        let session_loop = session_loop.clone();
        use_callback(move |intent: SurveyIntent| {
            let mut vm = vm;
            let mut error = error;
            let mut busy = busy;
            let mut last_action = last_action;

            if busy() {
                return;
            }
            let action = match intent {
                SurveyIntent::Edit(edit) => {
                    if vm.write().edit(edit) {
                        error.set(None);
                    }
                    return;
                }
                SurveyIntent::Submit => LastAction::Submit,
                SurveyIntent::Skip => LastAction::Skip,
            };

            let session_loop = session_loop.clone();
            spawn(async move {
                busy.set(true);
                last_action.set(Some(action));
                let mut local = vm.peek().clone();
                let result = if action == LastAction::Skip {
                    local.skip(&session_loop).await
                } else {
                    local.submit(&session_loop).await
                };
                vm.set(local);
                busy.set(false);
                error.set(result.err());
            });
        })
    };

    let retry_action = use_callback(move |()| match last_action() {
        Some(LastAction::Load) | None => {
            let mut resource = resource;
            resource.restart();
        }
        Some(LastAction::Submit) => dispatch_intent.call(SurveyIntent::Submit),
        Some(LastAction::Skip) => dispatch_intent.call(SurveyIntent::Skip),
    });

    let state = view_state_from_resource(&resource);
    let (title, progress_label, question, completion, can_skip) = {
        let vm = vm.read();
        (
            vm.title().to_owned(),
            vm.progress_label(),
            vm.question(),
            vm.completion(),
            vm.can_skip(),
        )
    };
    let busy_now = busy();
    let error_now = error();
    let submit_label = if busy_now { "Sending..." } else { "Next" };

    rsx! {
        div { class: "page survey-page",
            header { class: "survey-header",
                h2 { class: "survey-header__title", "{title}" }
                span { class: "survey-header__progress", "{progress_label}" }
            }
            match state {
                ViewState::Idle => rsx! {
                    p { "Idle" }
                },
                ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Error(err) => rsx! {
                    p { class: "survey-error", "{err.message()}" }
                    button {
                        class: "btn btn-secondary",
                        r#type: "button",
                        onclick: move |_| retry_action.call(()),
                        "Retry"
                    }
                },
                ViewState::Ready(()) => rsx! {
                    if let Some(completion) = completion {
                        CompletionPanel { completion }
                    } else if let Some(question) = question {
                        form {
                            class: "survey-question",
                            onsubmit: move |evt: FormEvent| {
                                evt.prevent_default();
                                dispatch_intent.call(SurveyIntent::Submit);
                            },
                            h3 { class: "survey-question__prompt", "{question.prompt}" }
                            QuestionWidget {
                                widget: question.widget.clone(),
                                disabled: busy_now,
                                on_edit: move |edit: SelectionEdit| {
                                    dispatch_intent.call(SurveyIntent::Edit(edit));
                                },
                            }
                            if let Some(err) = error_now {
                                div { class: "survey-error",
                                    p { "{err.message()}" }
                                    if err.is_retryable() {
                                        button {
                                            class: "btn btn-secondary",
                                            r#type: "button",
                                            onclick: move |_| retry_action.call(()),
                                            "Retry"
                                        }
                                    }
                                }
                            }
                            div { class: "survey-actions",
                                if can_skip {
                                    button {
                                        class: "btn btn-ghost",
                                        id: "survey-skip",
                                        r#type: "button",
                                        disabled: busy_now,
                                        onclick: move |_| dispatch_intent.call(SurveyIntent::Skip),
                                        "Skip"
                                    }
                                }
                                button {
                                    class: "btn btn-primary",
                                    id: "survey-next",
                                    r#type: "submit",
                                    disabled: busy_now,
                                    "{submit_label}"
                                }
                            }
                        }
                    } else {
                        p { "Loading..." }
                    }
                },
            }
        }
    }
}

#[component]
fn QuestionWidget(widget: WidgetVm, disabled: bool, on_edit: EventHandler<SelectionEdit>) -> Element {
    match widget {
        WidgetVm::Boolean { value } => {
            let yes_class = toggle_class(value == Some(true));
            let no_class = toggle_class(value == Some(false));
            rsx! {
                div { class: "widget widget--boolean",
                    button {
                        class: "{yes_class}",
                        r#type: "button",
                        disabled: disabled,
                        onclick: move |_| on_edit.call(SelectionEdit::SetBoolean(true)),
                        "Yes"
                    }
                    button {
                        class: "{no_class}",
                        r#type: "button",
                        disabled: disabled,
                        onclick: move |_| on_edit.call(SelectionEdit::SetBoolean(false)),
                        "No"
                    }
                }
            }
        }
        WidgetVm::Choice { multiple, options } => {
            let input_type = if multiple { "checkbox" } else { "radio" };
            rsx! {
                div { class: "widget widget--choice",
                    for option in options {
                        label { key: "{option.index}", class: "widget__option",
                            input {
                                r#type: input_type,
                                name: "choice",
                                checked: option.selected,
                                disabled: disabled,
                                onchange: move |_| on_edit.call(SelectionEdit::ToggleChoice(option.index)),
                            }
                            span { "{option.label}" }
                        }
                    }
                }
            }
        }
        WidgetVm::Text {
            value,
            length,
            max_length,
        } => {
            let counter_class = if length > max_length {
                "widget__counter widget__counter--over"
            } else {
                "widget__counter"
            };
            rsx! {
                div { class: "widget widget--text",
                    textarea {
                        value: "{value}",
                        disabled: disabled,
                        oninput: move |evt: FormEvent| on_edit.call(SelectionEdit::SetText(evt.value())),
                    }
                    span { class: "{counter_class}", "{length} / {max_length}" }
                }
            }
        }
        WidgetVm::Checklist { items } => rsx! {
            div { class: "widget widget--checklist",
                for item in items {
                    label { key: "{item.index}", class: "widget__option",
                        input {
                            r#type: "checkbox",
                            checked: item.selected,
                            disabled: disabled,
                            onchange: move |_| on_edit.call(SelectionEdit::ToggleChecklistItem(item.index)),
                        }
                        span { "{item.label}" }
                    }
                }
            }
        },
        WidgetVm::Range {
            min,
            max,
            step,
            value,
        } => {
            let shown = value.map_or_else(|| "-".to_owned(), |v| v.to_string());
            let slider = value.unwrap_or(min);
            rsx! {
                div { class: "widget widget--range",
                    input {
                        r#type: "range",
                        min: "{min}",
                        max: "{max}",
                        step: "{step}",
                        value: "{slider}",
                        disabled: disabled,
                        oninput: move |evt: FormEvent| on_edit.call(SelectionEdit::SetNumber(evt.value())),
                    }
                    span { class: "widget__value", "{shown}" }
                }
            }
        }
        WidgetVm::Number { min, max, input } => {
            let min = min.map(|v| v.to_string()).unwrap_or_default();
            let max = max.map(|v| v.to_string()).unwrap_or_default();
            rsx! {
                div { class: "widget widget--number",
                    input {
                        r#type: "number",
                        min: "{min}",
                        max: "{max}",
                        value: "{input}",
                        disabled: disabled,
                        oninput: move |evt: FormEvent| on_edit.call(SelectionEdit::SetNumber(evt.value())),
                    }
                }
            }
        }
    }
}

fn toggle_class(on: bool) -> &'static str {
    if on { "toggle toggle--on" } else { "toggle" }
}
