//! Rules for uploaded files.

use std::path::Path;

use crate::validation::FieldError;

/// The maximum number of characters in an uploaded file's name.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

const INVALID_FILE_NAME_CHARACTERS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Check that a file name is present, not too long and free of path or shell
/// metacharacters.
pub fn validate_file_name(file_name: &str) -> Result<(), FieldError> {
    if file_name.is_empty() {
        return Err(FieldError::FileNameEmpty);
    }

    if file_name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(FieldError::FileNameTooLong);
    }

    match file_name
        .chars()
        .find(|character| INVALID_FILE_NAME_CHARACTERS.contains(character))
    {
        Some(character) => Err(FieldError::FileNameInvalidCharacter(character)),
        None => Ok(()),
    }
}

/// Check that a file name ends in `.csv`, ignoring case.
pub fn validate_file_extension(file_name: &str) -> Result<(), FieldError> {
    let extension = Path::new(file_name)
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(()),
        Some(other) => Err(FieldError::FileExtension(format!(".{other}"))),
        None => Err(FieldError::FileExtension(String::new())),
    }
}

/// Check that a file is neither empty nor larger than `max_size` bytes.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), FieldError> {
    if size == 0 {
        return Err(FieldError::FileEmpty);
    }

    if size > max_size {
        return Err(FieldError::FileTooLarge(max_size));
    }

    Ok(())
}

#[cfg(test)]
mod file_validation_tests {
    use crate::validation::{
        FieldError, validate_file_extension, validate_file_name, validate_file_size,
    };

    const TEN_MEGABYTES: usize = 10 * 1024 * 1024;

    #[test]
    fn extension_accepts_csv_in_any_case() {
        assert_eq!(validate_file_extension("transactions.csv"), Ok(()));
        assert_eq!(validate_file_extension("TRANSACTIONS.CSV"), Ok(()));
    }

    #[test]
    fn extension_rejects_other_types() {
        assert_eq!(
            validate_file_extension("transactions.txt"),
            Err(FieldError::FileExtension(".txt".to_owned()))
        );
        assert_eq!(
            validate_file_extension("transactions.xlsx"),
            Err(FieldError::FileExtension(".xlsx".to_owned()))
        );
        assert_eq!(
            validate_file_extension("transactions"),
            Err(FieldError::FileExtension(String::new()))
        );
    }

    #[test]
    fn file_name_accepts_plain_names() {
        assert_eq!(validate_file_name("june statement (1).csv"), Ok(()));
    }

    #[test]
    fn file_name_rejects_empty_and_long_names() {
        assert_eq!(validate_file_name(""), Err(FieldError::FileNameEmpty));
        assert_eq!(
            validate_file_name(&format!("{}.csv", "a".repeat(252))),
            Err(FieldError::FileNameTooLong)
        );
    }

    #[test]
    fn file_name_rejects_path_characters() {
        for (file_name, character) in [
            ("../etc/passwd.csv", '/'),
            ("dir\\file.csv", '\\'),
            ("C:file.csv", ':'),
            ("*.csv", '*'),
            ("what?.csv", '?'),
            ("\"quoted\".csv", '"'),
            ("<file>.csv", '<'),
            ("a|b.csv", '|'),
        ] {
            assert_eq!(
                validate_file_name(file_name),
                Err(FieldError::FileNameInvalidCharacter(character)),
                "{file_name}"
            );
        }
    }

    #[test]
    fn size_must_be_between_one_byte_and_the_limit() {
        assert_eq!(validate_file_size(1, TEN_MEGABYTES), Ok(()));
        assert_eq!(validate_file_size(TEN_MEGABYTES, TEN_MEGABYTES), Ok(()));
        assert_eq!(
            validate_file_size(0, TEN_MEGABYTES),
            Err(FieldError::FileEmpty)
        );
        assert_eq!(
            validate_file_size(TEN_MEGABYTES + 1, TEN_MEGABYTES),
            Err(FieldError::FileTooLarge(TEN_MEGABYTES))
        );
    }
}
