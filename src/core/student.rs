//! Student roster business logic - enrolment, edits, soft removal and search.
//!
//! Students are addressed by admission number everywhere outside the store.
//! Removing a student only clears `is_active`; their fee history stays intact.

use crate::{
    entities::student,
    errors::{Error, Result},
    store::{FeeStore, NewStudent, StudentChanges},
};
use tracing::{info, instrument};

const MIN_PHONE_DIGITS: usize = 10;

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("{field} is required"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_phone(number: &str) -> Result<String> {
    let trimmed = number.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '-');
    if !allowed || digits < MIN_PHONE_DIGITS {
        return Err(Error::Validation {
            message: format!("Mobile number must have at least {MIN_PHONE_DIGITS} digits"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_country_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation {
            message: format!("Invalid country code '{trimmed}'"),
        });
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_email(email: Option<String>) -> Result<Option<String>> {
    match optional_text(email) {
        Some(address) if !address.contains('@') => Err(Error::Validation {
            message: format!("Invalid email address '{address}'"),
        }),
        other => Ok(other),
    }
}

fn validate_new(new: NewStudent) -> Result<NewStudent> {
    Ok(NewStudent {
        admission_number: required("Admission number", &new.admission_number)?,
        first_name: required("First name", &new.first_name)?,
        last_name: required("Last name", &new.last_name)?,
        country_code: validate_country_code(&new.country_code)?,
        phone_number: validate_phone(&new.phone_number)?,
        parent_name: optional_text(new.parent_name),
        email: validate_email(new.email)?,
    })
}

fn validate_changes(changes: StudentChanges) -> Result<StudentChanges> {
    Ok(StudentChanges {
        first_name: changes
            .first_name
            .map(|v| required("First name", &v))
            .transpose()?,
        last_name: changes
            .last_name
            .map(|v| required("Last name", &v))
            .transpose()?,
        country_code: changes
            .country_code
            .map(|v| validate_country_code(&v))
            .transpose()?,
        phone_number: changes
            .phone_number
            .map(|v| validate_phone(&v))
            .transpose()?,
        parent_name: optional_text(changes.parent_name),
        email: validate_email(changes.email)?,
    })
}

/// Enrols a student after trimming and validating every field.
///
/// # Errors
/// `Validation` for missing names, malformed phone or email;
/// `DuplicateAdmissionNumber` if the number is taken.
#[instrument(skip(store, new), fields(admission_number = %new.admission_number))]
pub async fn add_student(store: &dyn FeeStore, new: NewStudent) -> Result<student::Model> {
    let new = validate_new(new)?;
    let student = store.insert_student(new).await?;
    info!(
        "Enrolled {} ({})",
        student.full_name(),
        student.admission_number
    );
    Ok(student)
}

/// Looks up a student by admission number.
///
/// # Errors
/// `StudentNotFound` if no student has that number.
pub async fn get_student(store: &dyn FeeStore, admission_number: &str) -> Result<student::Model> {
    store
        .find_student_by_admission_number(admission_number.trim())
        .await?
        .ok_or_else(|| Error::StudentNotFound {
            key: admission_number.trim().to_string(),
        })
}

/// Edits a student's contact details or names.
pub async fn update_student(
    store: &dyn FeeStore,
    admission_number: &str,
    changes: StudentChanges,
) -> Result<student::Model> {
    let changes = validate_changes(changes)?;
    let student = get_student(store, admission_number).await?;
    store.update_student(student.id, changes).await
}

/// Soft-removes a student. Their fee records are kept.
#[instrument(skip(store))]
pub async fn deactivate_student(
    store: &dyn FeeStore,
    admission_number: &str,
) -> Result<student::Model> {
    let student = get_student(store, admission_number).await?;
    let updated = store.set_student_active(student.id, false).await?;
    info!("Deactivated student {}", updated.admission_number);
    Ok(updated)
}

/// Restores a previously deactivated student.
#[instrument(skip(store))]
pub async fn reactivate_student(
    store: &dyn FeeStore,
    admission_number: &str,
) -> Result<student::Model> {
    let student = get_student(store, admission_number).await?;
    store.set_student_active(student.id, true).await
}

/// Students whose admission number or full name contains `query`, ignoring case.
/// An empty query matches everyone. Ordered by admission number.
pub async fn search_students(
    store: &dyn FeeStore,
    query: &str,
    include_inactive: bool,
) -> Result<Vec<student::Model>> {
    let needle = query.trim().to_lowercase();
    Ok(store
        .list_students()
        .await?
        .into_iter()
        .filter(|s| include_inactive || s.is_active)
        .filter(|s| {
            needle.is_empty()
                || s.admission_number.to_lowercase().contains(&needle)
                || s.full_name().to_lowercase().contains(&needle)
        })
        .collect())
}

/// Enrols every seed whose admission number is not present yet.
/// Returns how many were added.
pub async fn seed_students(store: &dyn FeeStore, seeds: &[NewStudent]) -> Result<usize> {
    let mut added = 0;
    for seed in seeds {
        if store
            .find_student_by_admission_number(seed.admission_number.trim())
            .await?
            .is_some()
        {
            continue;
        }
        add_student(store, seed.clone()).await?;
        added += 1;
    }
    if added > 0 {
        info!("Seeded {} students from configuration", added);
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::*;

    fn new_student(admission_number: &str) -> NewStudent {
        NewStudent {
            admission_number: admission_number.to_string(),
            first_name: " Rahul ".to_string(),
            last_name: "Sharma".to_string(),
            country_code: "+91".to_string(),
            phone_number: "98765 43210".to_string(),
            parent_name: Some("  ".to_string()),
            email: Some("rahul.sharma@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_add_student_trims_and_activates() -> Result<()> {
        let store = setup_sea_store().await?;
        let student = add_student(&store, new_student(" BB2023001 ")).await?;

        assert_eq!(student.admission_number, "BB2023001");
        assert_eq!(student.first_name, "Rahul");
        assert_eq!(student.phone_number, "98765 43210");
        assert_eq!(student.parent_name, None);
        assert!(student.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_student_validation() {
        let store = MemoryStore::new();

        let mut missing_name = new_student("BB1");
        missing_name.first_name = "   ".to_string();
        assert!(matches!(
            add_student(&store, missing_name).await,
            Err(Error::Validation { .. })
        ));

        let mut short_phone = new_student("BB2");
        short_phone.phone_number = "12345".to_string();
        assert!(matches!(
            add_student(&store, short_phone).await,
            Err(Error::Validation { .. })
        ));

        let mut letters = new_student("BB3");
        letters.phone_number = "98765abc43210".to_string();
        assert!(add_student(&store, letters).await.is_err());

        let mut bad_code = new_student("BB4");
        bad_code.country_code = "IN".to_string();
        assert!(add_student(&store, bad_code).await.is_err());

        let mut bad_email = new_student("BB5");
        bad_email.email = Some("not-an-email".to_string());
        assert!(add_student(&store, bad_email).await.is_err());

        assert!(store.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_admission_number() -> Result<()> {
        let store = MemoryStore::new();
        add_student(&store, new_student("BB2023001")).await?;
        let result = add_student(&store, new_student("BB2023001")).await;
        assert!(matches!(
            result,
            Err(Error::DuplicateAdmissionNumber { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_student() -> Result<()> {
        let store = MemoryStore::new();
        add_student(&store, new_student("BB2023001")).await?;

        let updated = update_student(
            &store,
            "BB2023001",
            StudentChanges {
                phone_number: Some("87654-32109".to_string()),
                parent_name: Some("Suresh Sharma".to_string()),
                ..StudentChanges::default()
            },
        )
        .await?;
        assert_eq!(updated.phone_number, "87654-32109");
        assert_eq!(updated.parent_name.as_deref(), Some("Suresh Sharma"));

        let rejected = update_student(
            &store,
            "BB2023001",
            StudentChanges {
                last_name: Some(String::new()),
                ..StudentChanges::default()
            },
        )
        .await;
        assert!(matches!(rejected, Err(Error::Validation { .. })));

        let missing = update_student(&store, "NOPE", StudentChanges::default()).await;
        assert!(matches!(missing, Err(Error::StudentNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_is_soft() -> Result<()> {
        let store = MemoryStore::new();
        add_student(&store, new_student("BB2023003")).await?;

        let inactive = deactivate_student(&store, "BB2023003").await?;
        assert!(!inactive.is_active);
        assert!(search_students(&store, "", false).await?.is_empty());
        assert_eq!(search_students(&store, "", true).await?.len(), 1);

        let active = reactivate_student(&store, "BB2023003").await?;
        assert!(active.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_students() -> Result<()> {
        let store = MemoryStore::new();
        create_custom_student(&store, "BB2023002", "Priya", "Patel").await?;
        create_custom_student(&store, "BB2023001", "Rahul", "Sharma").await?;
        create_custom_student(&store, "BB2024001", "Aryan", "Singh").await?;

        let by_name = search_students(&store, "rahul sh", false).await?;
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].admission_number, "BB2023001");

        let by_number: Vec<String> = search_students(&store, "bb2023", false)
            .await?
            .into_iter()
            .map(|s| s.admission_number)
            .collect();
        assert_eq!(by_number, vec!["BB2023001", "BB2023002"]);

        assert_eq!(search_students(&store, "  ", false).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_students_skips_existing() -> Result<()> {
        let store = MemoryStore::new();
        let seeds = vec![new_student("BB2023001"), new_student("BB2023002")];

        assert_eq!(seed_students(&store, &seeds).await?, 2);
        assert_eq!(seed_students(&store, &seeds).await?, 0);
        assert_eq!(store.list_students().await?.len(), 2);
        Ok(())
    }
}
