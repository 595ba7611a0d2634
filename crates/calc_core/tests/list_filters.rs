use calc_core::db::open_db_in_memory;
use calc_core::engine::derive_draft;
use calc_core::{
    CalculationId, CalculationRepository, CalculationService, ListFilters, Principal,
    ServiceError, SqliteCalculationRepository, SqlitePrincipalRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;

type Service<'conn> =
    CalculationService<SqliteCalculationRepository<'conn>, SqlitePrincipalRepository<'conn>>;

struct Fixture<'conn> {
    conn: &'conn Connection,
    service: Service<'conn>,
    alice: Principal,
    bob: Principal,
    staff: Principal,
}

impl<'conn> Fixture<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        let service = CalculationService::new(
            SqliteCalculationRepository::new(conn),
            SqlitePrincipalRepository::new(conn),
        );
        let alice = Principal::new("alice");
        let bob = Principal::new("Bobby Tables");
        let staff = Principal::staff("admin");
        for principal in [&alice, &bob, &staff] {
            service.register_principal(principal).unwrap();
        }
        Self {
            conn,
            service,
            alice,
            bob,
            staff,
        }
    }

    fn insert_at(
        &self,
        owner: &Principal,
        operand1: f64,
        operand2: Option<f64>,
        operation: &str,
        day: (i32, u32, u32),
    ) -> CalculationId {
        let draft = derive_draft(owner.id, operand1, operand2, operation).unwrap();
        let created_at = NaiveDate::from_ymd_opt(day.0, day.1, day.2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        SqliteCalculationRepository::new(self.conn)
            .insert_calculation(&draft, created_at)
            .unwrap()
    }

    fn seed(&self) {
        self.insert_at(&self.alice, 1.0, Some(2.0), "add", (2024, 1, 10));
        self.insert_at(&self.alice, 9.0, None, "sqrt", (2024, 1, 15));
        self.insert_at(&self.alice, 2.0, Some(10.0), "power", (2024, 1, 20));
        self.insert_at(&self.bob, 7.0, Some(7.0), "multiply", (2024, 1, 15));
        self.insert_at(&self.bob, 100.0, Some(4.0), "divide", (2024, 2, 1));
        self.insert_at(&self.staff, 5.0, Some(3.0), "subtract", (2024, 1, 12));
    }
}

fn filters() -> ListFilters {
    ListFilters::default()
}

#[test]
fn default_listing_is_created_at_descending() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let listed = fx.service.list(Some(&fx.alice), &filters()).unwrap();
    let expressions = listed
        .iter()
        .map(|calculation| calculation.expression.as_str())
        .collect::<Vec<_>>();
    assert_eq!(expressions, vec!["2 ^ 10", "√(9)", "1 + 2"]);
}

#[test]
fn same_timestamp_ties_list_newest_insert_first() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let first = fx.insert_at(&fx.alice, 1.0, Some(1.0), "add", (2024, 5, 5));
    let second = fx.insert_at(&fx.alice, 2.0, Some(2.0), "add", (2024, 5, 5));

    let listed = fx.service.list(Some(&fx.alice), &filters()).unwrap();
    let ids = listed.iter().map(|calculation| calculation.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![second, first]);
}

#[test]
fn non_staff_never_sees_other_owners_for_any_filter() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let candidates = [
        filters(),
        ListFilters {
            owner_id: Some(fx.bob.id),
            ..filters()
        },
        ListFilters {
            username: Some("bob".to_string()),
            ..filters()
        },
        ListFilters {
            search: Some("Bobby".to_string()),
            ..filters()
        },
        ListFilters {
            operation: Some("multiply".to_string()),
            ..filters()
        },
        ListFilters {
            ordering: Some("username".to_string()),
            date_from: Some("2000-01-01".to_string()),
            ..filters()
        },
    ];

    for candidate in candidates {
        let listed = fx.service.list(Some(&fx.alice), &candidate).unwrap();
        assert!(
            listed.iter().all(|calculation| calculation.owner == fx.alice.id),
            "{candidate:?}"
        );
    }
}

#[test]
fn anonymous_listing_is_unauthorized() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    assert!(matches!(
        fx.service.list(None, &filters()).unwrap_err(),
        ServiceError::Unauthorized
    ));
}

#[test]
fn staff_sees_all_and_can_scope_by_owner() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    assert_eq!(fx.service.list(Some(&fx.staff), &filters()).unwrap().len(), 6);

    let bobs = fx
        .service
        .list(
            Some(&fx.staff),
            &ListFilters {
                owner_id: Some(fx.bob.id),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(bobs.len(), 2);
    assert!(bobs.iter().all(|calculation| calculation.owner == fx.bob.id));
}

#[test]
fn staff_username_filter_matches_case_insensitive_substring() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let listed = fx
        .service
        .list(
            Some(&fx.staff),
            &ListFilters {
                username: Some("bobby".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed
        .iter()
        .all(|calculation| calculation.owner_name == "Bobby Tables"));
}

#[test]
fn operation_filter_is_exact_and_unknown_codes_match_nothing() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let sqrt_only = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                operation: Some("sqrt".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(sqrt_only.len(), 1);
    assert_eq!(sqrt_only[0].expression, "√(9)");

    let unknown = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                operation: Some("sq".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert!(unknown.is_empty());
}

#[test]
fn date_bounds_are_inclusive_days() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let listed = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                date_from: Some("2024-01-15".to_string()),
                date_to: Some("2024-01-15".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].expression, "√(9)");

    let until_mid_month = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                date_to: Some("2024-01-15".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(until_mid_month.len(), 2);
}

#[test]
fn malformed_dates_are_silently_ignored() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let listed = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                date_from: Some("15/01/2024".to_string()),
                date_to: Some("not-a-date".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(listed.len(), 3);
}

#[test]
fn search_matches_expression_and_operation_code() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let by_symbol = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                search: Some("^".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(by_symbol.len(), 1);
    assert_eq!(by_symbol[0].expression, "2 ^ 10");

    let by_code = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                search: Some("SQRT".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(by_code.len(), 1);

    let by_phrase = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                search: Some("\"1 + 2\"".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(by_phrase.len(), 1);
}

#[test]
fn staff_search_also_covers_owner_names() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let listed = fx
        .service
        .list(
            Some(&fx.staff),
            &ListFilters {
                search: Some("tables".to_string()),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn ordering_supports_fields_directions_and_fallback() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let results = |ordering: &str| {
        fx.service
            .list(
                Some(&fx.alice),
                &ListFilters {
                    ordering: Some(ordering.to_string()),
                    ..filters()
                },
            )
            .unwrap()
            .iter()
            .map(|calculation| calculation.result)
            .collect::<Vec<_>>()
    };

    assert_eq!(results("result"), vec![3.0, 3.0, 1024.0]);
    assert_eq!(results("-operand1"), vec![3.0, 1024.0, 3.0]);
    assert_eq!(results("created_at"), vec![3.0, 3.0, 1024.0]);
    assert_eq!(results("-bogus"), vec![1024.0, 3.0, 3.0]);

    let operand1_desc = fx
        .service
        .list(
            Some(&fx.alice),
            &ListFilters {
                ordering: Some("-operand1".to_string()),
                ..filters()
            },
        )
        .unwrap();
    let operand1s = operand1_desc
        .iter()
        .map(|calculation| calculation.operand1)
        .collect::<Vec<_>>();
    assert_eq!(operand1s, vec![9.0, 2.0, 1.0]);
}

#[test]
fn limit_caps_result_count() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    fx.seed();

    let listed = fx
        .service
        .list(
            Some(&fx.staff),
            &ListFilters {
                limit: Some(2),
                ..filters()
            },
        )
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].expression, "100 / 4");
}
