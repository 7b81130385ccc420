use leptos::{html::Input, prelude::*};
use leptos_meta::Title;

use super::activity::GitHubActivity;

#[component]
pub fn HomePage() -> impl IntoView {
    let (username, set_username) = signal(None::<String>);
    let input_ref = NodeRef::<Input>::new();

    view! {
        <Title text="Contributions" />
        <div class="w-full max-w-4xl mx-auto page-content">
            <h1 class="text-2xl my-8 text-center font-bold section-content">"Contributions"</h1>
            <form
                class="flex flex-col sm:flex-row gap-3 items-start sm:items-center mb-6"
                on:submit=move |ev| {
                    ev.prevent_default();
                    let el = if let Some(el) = input_ref.get_untracked() {
                        el
                    } else {
                        return;
                    };
                    let value = el.value().trim().to_string();
                    set_username.set(if value.is_empty() { None } else { Some(value) });
                }
            >
                <label for="activity_user" class="font-medium text-cyan whitespace-nowrap">
                    "GitHub user:"
                </label>
                <div class="flex-grow w-full sm:max-w-md">
                    <input
                        id="activity_user"
                        class="w-full px-4 py-2 rounded-md border border-muted focus:outline-none focus:ring-2 focus:ring-cyan bg-background text-foreground placeholder-muted"
                        node_ref=input_ref
                        placeholder="Leave empty for the site owner"
                    />
                </div>
                <button
                    type="submit"
                    class="px-4 py-2 bg-cyan/20 hover:bg-cyan/30 text-cyan rounded-md border border-cyan/30 whitespace-nowrap"
                >
                    "Show"
                </button>
            </form>
            <section class="bg-brightBlack/30 rounded-lg border border-muted/30 section-content">
                <GitHubActivity username=username />
            </section>
        </div>
    }
}
