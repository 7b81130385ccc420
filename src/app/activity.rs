use std::sync::Arc;

use leptos::{prelude::*, server_fn::codec::GetUrl, task::spawn_local};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ssr")]
use crate::activity::service;
use crate::activity::{
    ContributionCalendar, ContributionData, DayRecord, RequestTracker, WeekStart, MAX_LEVEL,
};

const CELL_PITCH_PX: usize = 13;

const LEVEL_CLASSES: [&str; MAX_LEVEL as usize + 1] = [
    "bg-brightBlack/40",
    "bg-green/30",
    "bg-green/50",
    "bg-green/75",
    "bg-green",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub username: String,
    pub data: ContributionData,
    pub week_start: WeekStart,
}

/// `None` loads the site owner's configured identity.
#[server(input = GetUrl)]
pub async fn get_contributions_server(
    username: Option<String>,
) -> Result<ActivityResponse, ServerFnError> {
    let service =
        service::global().ok_or_else(|| ServerFnError::new("Activity service isn't running"))?;
    let username = username
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| service.config().username.clone());
    let data = service.load(&username).await;
    Ok(ActivityResponse {
        username,
        data,
        week_start: service.config().week_start,
    })
}

#[component]
pub fn GitHubActivity(#[prop(into)] username: Signal<Option<String>>) -> impl IntoView {
    let tracker = StoredValue::new(Arc::new(RequestTracker::new()));
    let (response, set_response) = signal(None::<ActivityResponse>);

    Effect::new(move |_| {
        let username = username.get();
        let tracker = tracker.get_value();
        let token = tracker.begin();
        set_response.set(None);
        spawn_local(async move {
            let res = get_contributions_server(username.clone())
                .await
                .unwrap_or_else(|e| {
                    log::warn!("couldn't load contributions: {e}");
                    ActivityResponse {
                        username: username.unwrap_or_default(),
                        data: ContributionData::Unavailable,
                        week_start: WeekStart::default(),
                    }
                });
            if tracker.is_current(token) {
                set_response.set(Some(res));
            } else {
                log::debug!("dropping stale contributions for {}", res.username);
            }
        });
    });

    view! {
        <div class="px-6 py-4">
            {move || match response.get() {
                None => view! { <ActivitySkeleton /> }.into_any(),
                Some(res) => {
                    let degraded = res.data.is_degraded();
                    match res.data.calendar(res.week_start) {
                        Some(calendar) => {
                            view! {
                                <Heatmap calendar=calendar username=res.username sample=degraded />
                            }
                                .into_any()
                        }
                        None => {
                            view! {
                                <p class="text-sm text-muted">
                                    "Activity for " {res.username} " is unavailable right now."
                                </p>
                            }
                                .into_any()
                        }
                    }
                }
            }}
        </div>
    }
}

#[component]
fn ActivitySkeleton() -> impl IntoView {
    view! {
        <div class="animate-pulse">
            <div class="loading-skeleton h-4 rounded w-24 mb-4"></div>
            <div class="loading-skeleton h-20 rounded"></div>
        </div>
    }
}

#[component]
fn Heatmap(calendar: ContributionCalendar, username: String, sample: bool) -> impl IntoView {
    let year = calendar
        .year()
        .map(|y| y.to_string())
        .unwrap_or_default();
    let total = group_thousands(calendar.total);

    view! {
        <div class="overflow-x-auto">
            <div class="min-w-[720px]">
                <div class="relative h-4 text-xs text-muted mb-2">
                    {calendar
                        .month_labels
                        .into_iter()
                        .map(|m| {
                            view! {
                                <span
                                    class="absolute w-12"
                                    style=format!("left: {}px", m.week_index * CELL_PITCH_PX)
                                >
                                    {m.label}
                                </span>
                            }
                        })
                        .collect_view()}
                </div>
                <div class="flex gap-[3px]">
                    {calendar
                        .weeks
                        .into_iter()
                        .enumerate()
                        .map(|(week_index, week)| {
                            view! {
                                <div class="flex flex-col gap-[3px]">
                                    {week
                                        .into_iter()
                                        .enumerate()
                                        .map(|(day_index, day)| {
                                            view! {
                                                <DayCell
                                                    day=day
                                                    delay_ms=(week_index * 7 + day_index) * 2
                                                />
                                            }
                                        })
                                        .collect_view()}
                                </div>
                            }
                        })
                        .collect_view()}
                </div>
            </div>
        </div>
        <div class="flex items-center justify-between mt-4 text-xs text-muted">
            <span>
                {total} " activities in " {year}
                {sample
                    .then(|| {
                        view! {
                            <span class="ml-2 text-yellow" title=format!("github.com/{username}")>
                                "(sample data)"
                            </span>
                        }
                    })}
            </span>
            <div class="flex items-center gap-1">
                <span>"Less"</span>
                {LEVEL_CLASSES
                    .iter()
                    .map(|class| {
                        view! { <div class=format!("size-[10px] rounded-[2px] {class}")></div> }
                    })
                    .collect_view()}
                <span>"More"</span>
            </div>
        </div>
    }
}

#[component]
fn DayCell(day: DayRecord, delay_ms: usize) -> impl IntoView {
    let shade = usize::try_from(day.level)
        .ok()
        .and_then(|l| LEVEL_CLASSES.get(l))
        .copied()
        .unwrap_or("bg-transparent");
    let title = day
        .date
        .map(|d| format!("{} contributions on {}", day.count, d.format("%Y-%m-%d")));
    view! {
        <div
            class=format!("size-[10px] rounded-[2px] contribution-cell {shade}")
            style=format!("--delay: {delay_ms}ms")
            title=title
        ></div>
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn placeholders_have_no_shade() {
        assert_eq!(LEVEL_CLASSES.len(), 5);
        assert!(usize::try_from(DayRecord::placeholder().level).is_err());
    }
}
