use crate::io::input::AnnotatedGeometry;

/// Gives every shape of the listed classes its own class `<class>_<NNN>`
/// (1-based, table order) so each can go to a separate well.
///
/// Matching uses the original class name, so running this again with the
/// same list renames from scratch instead of stacking suffixes.
pub fn make_classes_unique(table: &mut [AnnotatedGeometry], classes_to_split: &[String]) {
    for record in table.iter_mut() {
        if record.original_classification_name.is_none() {
            record.original_classification_name = record.classification_name.clone();
        }
    }

    for class_name in classes_to_split {
        let mut counter = 0;
        for record in table
            .iter_mut()
            .filter(|r| r.original_classification_name.as_deref() == Some(class_name.as_str()))
        {
            counter += 1;
            let unique = format!("{}_{:03}", class_name, counter);
            if let Some(classification) = record.classification.as_mut() {
                classification.name = Some(unique.clone());
            }
            record.classification_name = Some(unique);
        }
        if counter == 0 {
            log::warn!("No shapes of class {} to split", class_name);
        } else {
            log::info!("Split {} shapes of class {} into unique classes", counter, class_name);
        }
    }
}

#[cfg(test)]
mod classes_tests {
    use super::*;
    use crate::utils::test_utils::clean_record;

    fn class_names(table: &[AnnotatedGeometry]) -> Vec<&str> {
        table
            .iter()
            .map(|r| r.classification_name.as_deref().unwrap())
            .collect()
    }

    #[test]
    fn test_split_numbers_in_table_order() {
        let mut table = vec![
            clean_record("a", "Tumor", 0.0),
            clean_record("b", "Stroma", 10.0),
            clean_record("c", "Tumor", 20.0),
        ];
        make_classes_unique(&mut table, &["Tumor".to_string()]);
        assert_eq!(class_names(&table), vec!["Tumor_001", "Stroma", "Tumor_002"]);
        assert_eq!(table[2].original_classification_name.as_deref(), Some("Tumor"));
        assert_eq!(
            table[2].classification.as_ref().unwrap().name.as_deref(),
            Some("Tumor_002")
        );
    }

    #[test]
    fn test_split_twice_does_not_stack_suffixes() {
        let mut table = vec![
            clean_record("a", "Tumor", 0.0),
            clean_record("b", "Tumor", 10.0),
        ];
        let classes = vec!["Tumor".to_string()];
        make_classes_unique(&mut table, &classes);
        make_classes_unique(&mut table, &classes);
        assert_eq!(class_names(&table), vec!["Tumor_001", "Tumor_002"]);
    }

    #[test]
    fn test_unknown_class_is_a_no_op() {
        let mut table = vec![clean_record("a", "Tumor", 0.0)];
        make_classes_unique(&mut table, &["Immune".to_string()]);
        assert_eq!(class_names(&table), vec!["Tumor"]);
    }
}
