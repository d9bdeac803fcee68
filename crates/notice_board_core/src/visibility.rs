//! crates/notice_board_core/src/visibility.rs
//!
//! Computes which notices a viewer may see. The result is a plain predicate
//! value that can be evaluated in memory or translated into a SQL `WHERE`
//! clause by a database adapter.

use std::cmp::Reverse;

use crate::domain::{Notice, NoticeCategory, NoticeStatus, Role, User, ALL_DEPARTMENTS};

/// Filters supplied explicitly by the caller of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeQuery {
    pub category: Option<NoticeCategory>,
    pub department: Option<String>,
    pub status: Option<NoticeStatus>,
    pub search: Option<String>,
}

/// A composed predicate over notices. Archived notices never match.
///
/// Every populated field is AND-ed together; `departments`, `target_year` and
/// `search` are each internally an OR of conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeFilter {
    pub status: NoticeStatus,
    pub category: Option<NoticeCategory>,
    /// Notice department must be one of these.
    pub departments: Option<Vec<String>>,
    /// Notice target year must be null, empty, or equal to this.
    pub target_year: Option<String>,
    /// Case-insensitive substring of title or content.
    pub search: Option<String>,
}

/// Builds the visibility predicate for `viewer` (or an anonymous reader).
pub fn visible_predicate(viewer: Option<&User>, query: &NoticeQuery) -> NoticeFilter {
    let explicit_department = non_empty(query.department.as_deref());

    let departments = match (explicit_department, viewer) {
        (Some(department), _) => Some(vec![department.to_string()]),
        (None, Some(user)) if matches!(user.role, Role::Student | Role::Faculty) => {
            Some(vec![user.department.clone(), ALL_DEPARTMENTS.to_string()])
        }
        _ => None,
    };

    let target_year = viewer
        .filter(|user| user.role == Role::Student)
        .and_then(|user| non_empty(user.year.as_deref()))
        .map(str::to_string);

    NoticeFilter {
        status: query.status.unwrap_or(NoticeStatus::Published),
        category: query.category,
        departments,
        target_year,
        search: non_empty(query.search.as_deref()).map(str::to_string),
    }
}

/// Whether `viewer` may open `notice` directly.
///
/// Authors and admins always may. Anyone else needs a published, unarchived
/// notice that their own listing would include.
pub fn can_read(viewer: Option<&User>, notice: &Notice) -> bool {
    if viewer.is_some_and(|v| v.id == notice.author_id || v.is_admin()) {
        return true;
    }
    if !notice.is_published() {
        return false;
    }
    visible_predicate(viewer, &NoticeQuery::default()).matches(notice)
}

impl NoticeFilter {
    pub fn matches(&self, notice: &Notice) -> bool {
        if notice.is_archived || notice.status != self.status {
            return false;
        }
        if self.category.is_some_and(|c| c != notice.category) {
            return false;
        }
        if let Some(departments) = &self.departments {
            if !departments.iter().any(|d| *d == notice.department) {
                return false;
            }
        }
        if let Some(year) = &self.target_year {
            let open = notice.target_year.as_deref().map_or(true, str::is_empty);
            if !open && notice.target_year.as_deref() != Some(year.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !notice.title.to_lowercase().contains(&needle)
                && !notice.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    /// Listing order: pinned notices first, then newest first.
    pub fn sort(notices: &mut [Notice]) {
        notices.sort_by_key(|n| (Reverse(n.is_pinned), Reverse(n.created_at)));
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NoticePriority, User};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn user(role: Role, department: &str, year: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "viewer".into(),
            email: "viewer@example.edu".into(),
            role,
            department: department.into(),
            year: year.map(Into::into),
            is_active: true,
        }
    }

    fn notice(department: &str, target_year: Option<&str>) -> Notice {
        let now = Utc::now();
        Notice {
            id: Uuid::new_v4(),
            title: "Mid-term schedule".into(),
            content: "Exams start on Monday".into(),
            category: NoticeCategory::Exams,
            department: department.into(),
            target_year: target_year.map(Into::into),
            author_id: Uuid::new_v4(),
            priority: NoticePriority::Medium,
            status: NoticeStatus::Published,
            scheduled_date: None,
            attachments: vec![],
            views: vec![],
            acknowledged: vec![],
            is_pinned: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn student_sees_own_year_but_not_other_years() {
        let student = user(Role::Student, "CSE", Some("3rd Year"));
        let filter = visible_predicate(Some(&student), &NoticeQuery::default());

        assert!(filter.matches(&notice("CSE", Some("3rd Year"))));
        assert!(!filter.matches(&notice("CSE", Some("2nd Year"))));
        assert!(filter.matches(&notice("CSE", None)));
        assert!(filter.matches(&notice("CSE", Some(""))));
    }

    #[test]
    fn all_departments_is_visible_to_students_and_faculty() {
        let student = user(Role::Student, "ECE", Some("1st Year"));
        let faculty = user(Role::Faculty, "MECH", None);
        let broad = notice(ALL_DEPARTMENTS, None);

        for viewer in [&student, &faculty] {
            let filter = visible_predicate(Some(viewer), &NoticeQuery::default());
            assert!(filter.matches(&broad));
            assert!(!filter.matches(&notice("CSE", None)));
        }
    }

    #[test]
    fn faculty_is_not_narrowed_by_year() {
        let faculty = user(Role::Faculty, "CSE", Some("3rd Year"));
        let filter = visible_predicate(Some(&faculty), &NoticeQuery::default());
        assert!(filter.target_year.is_none());
        assert!(filter.matches(&notice("CSE", Some("1st Year"))));
    }

    #[test]
    fn admin_and_anonymous_see_every_department() {
        let admin = user(Role::Admin, "Administration", None);
        for viewer in [Some(&admin), None] {
            let filter = visible_predicate(viewer, &NoticeQuery::default());
            assert!(filter.departments.is_none());
            assert!(filter.matches(&notice("CSE", Some("2nd Year"))));
        }
    }

    #[test]
    fn explicit_department_overrides_own_department() {
        let student = user(Role::Student, "CSE", None);
        let query = NoticeQuery {
            department: Some("ECE".into()),
            ..Default::default()
        };
        let filter = visible_predicate(Some(&student), &query);

        assert_eq!(filter.departments, Some(vec!["ECE".to_string()]));
        assert!(filter.matches(&notice("ECE", None)));
        assert!(!filter.matches(&notice("CSE", None)));
        assert!(!filter.matches(&notice(ALL_DEPARTMENTS, None)));
    }

    #[test]
    fn status_defaults_to_published_and_archived_never_matches() {
        let filter = visible_predicate(None, &NoticeQuery::default());
        let mut draft = notice("CSE", None);
        draft.status = NoticeStatus::Draft;
        assert!(!filter.matches(&draft));

        let drafts = visible_predicate(
            None,
            &NoticeQuery {
                status: Some(NoticeStatus::Draft),
                ..Default::default()
            },
        );
        assert!(drafts.matches(&draft));

        let mut archived = notice("CSE", None);
        archived.is_archived = true;
        assert!(!filter.matches(&archived));
    }

    #[test]
    fn search_matches_title_or_content_ignoring_case() {
        let by_title = visible_predicate(
            None,
            &NoticeQuery {
                search: Some("MID-TERM".into()),
                ..Default::default()
            },
        );
        let by_content = visible_predicate(
            None,
            &NoticeQuery {
                search: Some("monday".into()),
                ..Default::default()
            },
        );
        let miss = visible_predicate(
            None,
            &NoticeQuery {
                search: Some("holiday".into()),
                ..Default::default()
            },
        );
        let n = notice("CSE", None);
        assert!(by_title.matches(&n));
        assert!(by_content.matches(&n));
        assert!(!miss.matches(&n));
    }

    #[test]
    fn direct_reads_follow_the_audience() {
        let cse_student = user(Role::Student, "CSE", Some("3rd Year"));
        let ece_faculty = user(Role::Faculty, "ECE", None);
        let admin = user(Role::Admin, "Administration", None);

        let mut draft = notice("ECE", Some("2nd Year"));
        draft.author_id = ece_faculty.id;
        draft.status = NoticeStatus::Draft;
        assert!(can_read(Some(&ece_faculty), &draft));
        assert!(can_read(Some(&admin), &draft));
        assert!(!can_read(Some(&cse_student), &draft));
        assert!(!can_read(None, &draft));

        draft.status = NoticeStatus::Published;
        assert!(!can_read(Some(&cse_student), &draft));
        assert!(can_read(None, &draft));
        assert!(can_read(Some(&cse_student), &notice(ALL_DEPARTMENTS, Some("3rd Year"))));

        let mut archived = notice("CSE", None);
        archived.is_archived = true;
        assert!(!can_read(Some(&cse_student), &archived));
        assert!(can_read(Some(&admin), &archived));
    }

    #[test]
    fn sort_puts_pinned_first_then_newest() {
        let mut old_pinned = notice("CSE", None);
        old_pinned.is_pinned = true;
        old_pinned.created_at = Utc::now() - Duration::days(3);
        let newest = notice("CSE", None);
        let mut older = notice("CSE", None);
        older.created_at = Utc::now() - Duration::days(1);

        let mut list = vec![older.clone(), newest.clone(), old_pinned.clone()];
        NoticeFilter::sort(&mut list);
        let ids: Vec<_> = list.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![old_pinned.id, newest.id, older.id]);
    }
}
