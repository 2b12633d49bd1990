//! Derived, read-only views over a task collection: the filtered/sorted list,
//! aggregate counters and calendar lookups. Nothing here is cached; callers
//! recompute on every access.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::models::{Priority, SortDirection, SortKey, StatusFilter, Task, TaskFilter, TaskStats};

pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    let query = filter
        .search_query
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_lowercase);

    let mut out: Vec<Task> = tasks
        .iter()
        .filter(|task| matches_status(task, filter.status))
        .filter(|task| match filter.category_id.as_deref() {
            Some(category_id) => task.category_id.as_deref() == Some(category_id),
            None => true,
        })
        .filter(|task| match query.as_deref() {
            Some(query) => matches_search(task, query),
            None => true,
        })
        .cloned()
        .collect();

    // `sort_by` is stable, so ties keep collection order.
    out.sort_by(|a, b| compare_tasks(a, b, filter.sort_by, filter.sort_direction));
    out
}

fn matches_status(task: &Task, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Active => !task.completed,
        StatusFilter::Completed => task.completed,
    }
}

fn matches_search(task: &Task, query: &str) -> bool {
    task.title.to_lowercase().contains(query)
        || task
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(query))
}

pub fn compare_tasks(a: &Task, b: &Task, key: SortKey, direction: SortDirection) -> Ordering {
    let directed = |ordering: Ordering| match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    match key {
        // Undated tasks go last whichever way the list is sorted.
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(a_due), Some(b_due)) => directed(a_due.cmp(&b_due)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        // Rank 0 is the most urgent, so descending starts at high.
        SortKey::Priority => directed(b.priority.rank().cmp(&a.priority.rank())),
        SortKey::Title => directed(compare_titles(&a.title, &b.title)),
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
    }
}

/// Accents and case are ignored first, so "École" files under `e`. Ties fall
/// back to the unaccented spelling, then to lowercase before uppercase.
fn compare_titles(a: &str, b: &str) -> Ordering {
    fold_title(a)
        .cmp(&fold_title(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn fold_title(title: &str) -> String {
    deunicode::deunicode(title).to_lowercase()
}

/// Counters for the dashboard. Calendar days are taken in `now`'s time zone.
pub fn compute_stats<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> TaskStats {
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);
    let zone = now.timezone();

    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };
    for task in tasks {
        if task.completed {
            stats.completed += 1;
            continue;
        }
        if task.priority == Priority::High {
            stats.high_priority += 1;
        }
        if let Some(due) = task.due_date {
            if due.with_timezone(&zone).date_naive() == today {
                stats.due_today += 1;
            }
            if due < now_utc {
                stats.overdue += 1;
            }
        }
    }
    stats.active = stats.total - stats.completed;
    stats
}

/// Tasks whose due date falls on `date` in time zone `zone`, in collection order.
pub fn tasks_due_on<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, zone: &Tz) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| {
            task.due_date
                .is_some_and(|due| due.with_timezone(zone).date_naive() == date)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono_tz::Europe::Paris;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn make_task(id: &str, title: &str, created_at: DateTime<Utc>) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            completed: false,
            created_at,
            due_date: None,
            priority: Priority::Medium,
            category_id: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn sorted(key: SortKey, direction: SortDirection) -> TaskFilter {
        TaskFilter {
            sort_by: key,
            sort_direction: direction,
            ..TaskFilter::default()
        }
    }

    #[test]
    fn default_filter_lists_everything_newest_first() {
        let tasks = vec![
            make_task("a", "first", at(1, 8)),
            make_task("b", "second", at(2, 8)),
            make_task("c", "third", at(3, 8)),
        ];
        let out = filter_tasks(&tasks, &TaskFilter::default());
        assert_eq!(ids(&out), vec!["c", "b", "a"]);
    }

    #[test]
    fn status_category_and_search_are_combined() {
        let mut milk = make_task("milk", "Buy milk", at(1, 8));
        milk.category_id = Some("3".to_string());
        let mut bread = make_task("bread", "Bake bread", at(1, 9));
        bread.category_id = Some("3".to_string());
        bread.description = Some("with MILK glaze".to_string());
        let mut done_milk = make_task("done", "Milk the cat", at(1, 10));
        done_milk.completed = true;
        done_milk.category_id = Some("3".to_string());
        let mut work = make_task("work", "Milkshake meeting", at(1, 11));
        work.category_id = Some("2".to_string());
        let tasks = vec![milk, bread, done_milk, work];

        let filter = TaskFilter {
            status: StatusFilter::Active,
            category_id: Some("3".to_string()),
            search_query: Some("mIlK".to_string()),
            sort_by: SortKey::CreatedAt,
            sort_direction: SortDirection::Asc,
        };
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["milk", "bread"]);

        let completed = TaskFilter {
            status: StatusFilter::Completed,
            ..TaskFilter::default()
        };
        assert_eq!(ids(&filter_tasks(&tasks, &completed)), vec!["done"]);

        // A blank query does not filter anything out.
        let blank = TaskFilter {
            search_query: Some("   ".to_string()),
            ..TaskFilter::default()
        };
        assert_eq!(filter_tasks(&tasks, &blank).len(), 4);
    }

    #[test]
    fn due_date_sort_puts_undated_last_in_both_directions() {
        let mut late = make_task("late", "late", at(1, 8));
        late.due_date = Some(at(20, 8));
        let mut early = make_task("early", "early", at(1, 8));
        early.due_date = Some(at(10, 8));
        let tasks = vec![undated_with_id("none"), late, undated_with_id("none2"), early];

        let asc = filter_tasks(&tasks, &sorted(SortKey::DueDate, SortDirection::Asc));
        assert_eq!(ids(&asc), vec!["early", "late", "none", "none2"]);

        let desc = filter_tasks(&tasks, &sorted(SortKey::DueDate, SortDirection::Desc));
        assert_eq!(ids(&desc), vec!["late", "early", "none", "none2"]);
    }

    fn undated_with_id(id: &str) -> Task {
        make_task(id, id, at(1, 8))
    }

    #[test]
    fn priority_sort_desc_surfaces_high_first() {
        let mut low = make_task("low", "l", at(1, 8));
        low.priority = Priority::Low;
        let mut high = make_task("high", "h", at(1, 8));
        high.priority = Priority::High;
        let medium = make_task("medium", "m", at(1, 8));
        let tasks = vec![low, medium, high];

        let desc = filter_tasks(&tasks, &sorted(SortKey::Priority, SortDirection::Desc));
        assert_eq!(ids(&desc), vec!["high", "medium", "low"]);
        let asc = filter_tasks(&tasks, &sorted(SortKey::Priority, SortDirection::Asc));
        assert_eq!(ids(&asc), vec!["high", "medium", "low"].into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn title_sort_ignores_case() {
        let tasks = vec![
            make_task("b", "banana", at(1, 8)),
            make_task("A", "Apple", at(1, 8)),
            make_task("c", "cherry", at(1, 8)),
            make_task("a", "apple", at(1, 8)),
        ];
        let asc = filter_tasks(&tasks, &sorted(SortKey::Title, SortDirection::Asc));
        assert_eq!(ids(&asc), vec!["a", "A", "b", "c"]);
    }

    #[test]
    fn title_sort_files_accented_letters_with_their_base_letter() {
        let tasks = vec![
            make_task("zoo", "Zoo trip", at(1, 8)),
            make_task("ecole", "École", at(1, 8)),
            make_task("fig", "fig jam", at(1, 8)),
            make_task("plain", "Ecole", at(1, 8)),
        ];
        let asc = filter_tasks(&tasks, &sorted(SortKey::Title, SortDirection::Asc));
        assert_eq!(ids(&asc), vec!["plain", "ecole", "fig", "zoo"]);

        let desc = filter_tasks(&tasks, &sorted(SortKey::Title, SortDirection::Desc));
        assert_eq!(ids(&desc), vec!["zoo", "fig", "ecole", "plain"]);
    }

    #[test]
    fn empty_collection_has_zero_stats() {
        assert_eq!(compute_stats(&[], &Utc::now()), TaskStats::default());
    }

    #[test]
    fn stats_count_due_today_overdue_and_high_priority() {
        let now = Paris.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let now_utc = now.with_timezone(&Utc);

        let mut later_today = make_task("today", "t", at(1, 8));
        later_today.due_date = Some(now_utc + Duration::hours(2));
        let mut yesterday = make_task("yesterday", "y", at(1, 8));
        yesterday.due_date = Some(now_utc - Duration::days(1));
        yesterday.priority = Priority::High;
        let mut done = make_task("done", "d", at(1, 8));
        done.completed = true;
        done.priority = Priority::High;
        done.due_date = Some(now_utc - Duration::days(3));
        let tasks = vec![later_today, yesterday, done, make_task("plain", "p", at(1, 8))];

        let stats = compute_stats(&tasks, &now);
        assert_eq!(
            stats,
            TaskStats {
                total: 4,
                completed: 1,
                active: 3,
                due_today: 1,
                overdue: 1,
                high_priority: 1,
            }
        );
        assert_eq!(stats.active + stats.completed, stats.total);
    }

    #[test]
    fn due_today_uses_the_local_calendar_day() {
        // 23:30 UTC on the 14th is already the 15th in Paris.
        let now = Paris.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let mut task = make_task("late-night", "t", at(1, 8));
        task.due_date = Some(Utc.with_ymd_and_hms(2024, 3, 14, 23, 30, 0).unwrap());

        let stats = compute_stats(std::slice::from_ref(&task), &now);
        assert_eq!(stats.due_today, 1);
        // Earlier today still counts as overdue.
        assert_eq!(stats.overdue, 1);

        let stats_utc = compute_stats(&[task], &now.with_timezone(&Utc));
        assert_eq!(stats_utc.due_today, 0);
    }

    #[test]
    fn tasks_due_on_matches_calendar_day() {
        let mut a = make_task("a", "a", at(1, 8));
        a.due_date = Some(at(5, 23));
        let mut b = make_task("b", "b", at(1, 8));
        b.due_date = Some(at(6, 1));
        let c = make_task("c", "c", at(1, 8));
        let tasks = vec![a, b, c];

        let day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert_eq!(ids(&tasks_due_on(&tasks, day, &Utc)), vec!["b"]);
        // In Paris, 23:00 UTC on the 5th is already the 6th.
        assert_eq!(ids(&tasks_due_on(&tasks, day, &Paris)), vec!["a", "b"]);
    }
}
