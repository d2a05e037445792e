use polars::prelude::*;

use std::fs;
use std::path::PathBuf;

use luape::prelude::*;


/// Write `content` to a fresh file in the temporary directory.
fn write_csv(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir()
        .join(format!("luape-{}-{name}.csv", std::process::id()));
    fs::write(&path, content).unwrap();
    path
}


/// Tests for reading samples.
#[cfg(test)]
pub mod sample_tests {
    use super::*;

    #[test]
    fn read_csv_with_missing_cells() {
        let path = write_csv(
            "missing",
            "x,flag,class\n1.5,1,1\n?,0,-1\nNA,,1\n\n3,1,-1\n",
        );
        let sample = Sample::from_csv(&path, true)
            .unwrap()
            .set_target("class")
            .unwrap()
            .set_feature_type("flag", Type::Boolean)
            .unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(sample.shape(), (4, 2));
        assert_eq!(sample.target(), &[1.0, -1.0, 1.0, -1.0]);

        let x = sample.feature("x").unwrap();
        assert_eq!(x.ty(), Type::Double);
        assert_eq!(x.get(1), Value::Missing);
        assert_eq!(x.get(2), Value::Missing);
        assert_eq!(x.distinct_value_count(), 2);

        let flag = sample.feature("flag").unwrap();
        assert_eq!(flag.ty(), Type::Boolean);
        assert_eq!(flag.get(1), Value::Boolean(false));
        assert_eq!(flag.get(2), Value::Missing);
        assert!(sample.feature("class").is_none());

        assert_eq!(sample.row(0), vec![Value::Double(1.5), Value::Boolean(true)]);
    }


    #[test]
    fn read_csv_without_header() {
        let path = write_csv("headless", "1,2\n3,4\n");
        let sample = Sample::from_csv(&path, false).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(sample.shape(), (2, 2));
        assert!(sample.target().is_empty());
        let names = sample.features().iter()
            .map(|f| f.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Feat. [1]", "Feat. [2]"]);

        let sample = sample.rename_feature("Feat. [2]", "y").unwrap();
        assert_eq!(sample.feature("y").unwrap().get(1), Value::Double(4.0));
    }


    #[test]
    fn malformed_csv_is_rejected() {
        let path = write_csv("word", "a,b\n1,x\n");
        let result = Sample::from_csv(&path, true);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));

        let path = write_csv("ragged", "a,b\n1,2\n3\n");
        let result = Sample::from_csv(&path, true);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));

        let result = Sample::from_csv("/nonexistent/luape.csv", true);
        assert!(matches!(result, Err(LuapeError::Io(_))));
    }


    #[test]
    fn unknown_names_and_bad_types() {
        let sample = Sample::from_features(
            vec![Feature::double("x", vec![0.0, 1.5, 2.0])],
            vec![0.0, 1.0, 0.0],
        ).unwrap();

        let result = sample.clone().set_target("y");
        assert!(matches!(result, Err(LuapeError::MissingFeature(_))));
        let result = sample.clone().set_feature_type("x", Type::Integer);
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));

        let result = Sample::from_features(
            vec![Feature::double("x", vec![0.0]), Feature::double("y", vec![0.0, 1.0])],
            Vec::new(),
        );
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));
        let result = Feature::enumeration("c", 2, vec![Some(0), Some(2)]);
        assert!(result.is_err());
        let result = Feature::new("c", Type::Boolean, Column::Double(vec![1.0]));
        assert!(result.is_err());
    }


    #[test]
    fn retype_to_enumeration() {
        let sample = Sample::from_features(
            vec![Feature::double("c", vec![0.0, 2.0, f64::NAN, 1.0])],
            Vec::new(),
        ).unwrap()
            .set_feature_type("c", Type::Enumeration(3))
            .unwrap();

        let c = sample.feature("c").unwrap();
        assert_eq!(c.ty(), Type::Enumeration(3));
        assert_eq!(c.get(1), Value::Integer(2));
        assert_eq!(c.get(2), Value::Missing);
    }


    #[test]
    fn convert_a_dataframe() {
        let data = df!(
            "x" => &[1.0, 2.0, 3.0],
            "flag" => &[true, false, true],
            "count" => &[1_i64, 5, 7],
        ).unwrap();
        let target = Series::new("y", &[1_i32, -1, 1]);
        let sample = Sample::from_dataframe(data, target).unwrap();

        assert_eq!(sample.shape(), (3, 3));
        assert_eq!(sample.target(), &[1.0, -1.0, 1.0]);
        assert_eq!(sample.feature("flag").unwrap().ty(), Type::Boolean);
        assert_eq!(sample.feature("count").unwrap().get(2), Value::Double(7.0));
        assert_eq!(sample.row(1), vec![
            Value::Double(2.0), Value::Boolean(false), Value::Double(5.0),
        ]);
    }
}
