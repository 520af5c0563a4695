//! Integration tests for the logger adapter and its setters

mod common;

use common::{buffered_logger, json_lines};
use reqlog::engine::{Buffer, Level, Record, Sink};
use reqlog::{Json, LevelLogger, Logger, Lvl, Setter};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn foobar() -> Json {
    let mut j = Json::new();
    j.insert("message".to_string(), Value::from("foobar"));
    j
}

mod emission {
    use super::*;

    #[test]
    fn test_print_writes_dash_level() {
        let (logger, buffer) = buffered_logger(vec![]);
        logger.print(&"foo");
        assert_eq!(buffer.contents(), "{\"level\":\"-\",\"message\":\"foo\"}\n");
    }

    #[test]
    fn test_every_level_in_every_form() {
        let (logger, buffer) = buffered_logger(vec![]);
        type Forms = (
            &'static str,
            fn(&Logger, &dyn std::fmt::Display),
            fn(&Logger, std::fmt::Arguments<'_>),
            fn(&Logger, Json),
        );
        let table: [Forms; 4] = [
            ("debug", |l, m| l.debug(m), |l, a| l.debugf(a), |l, j| l.debugj(j)),
            ("info", |l, m| l.info(m), |l, a| l.infof(a), |l, j| l.infoj(j)),
            ("warn", |l, m| l.warn(m), |l, a| l.warnf(a), |l, j| l.warnj(j)),
            ("error", |l, m| l.error(m), |l, a| l.errorf(a), |l, j| l.errorj(j)),
        ];

        for (level, plain, formatted, structured) in table {
            let expected = format!("{{\"level\":\"{}\",\"message\":\"foobar\"}}\n", level);

            buffer.reset();
            plain(&logger, &"foobar");
            assert_eq!(buffer.contents(), expected);

            buffer.reset();
            formatted(&logger, format_args!("foo{}", "bar"));
            assert_eq!(buffer.contents(), expected);

            buffer.reset();
            structured(&logger, foobar());
            assert_eq!(buffer.contents(), expected);
        }
    }

    #[test]
    fn test_printj_flattens_fields() {
        let (logger, buffer) = buffered_logger(vec![]);
        let mut j = Json::new();
        j.insert("user".to_string(), json!("u1"));
        j.insert("attempt".to_string(), json!(2));

        logger.printj(j);

        assert_eq!(
            buffer.contents(),
            "{\"level\":\"-\",\"user\":\"u1\",\"attempt\":2}\n"
        );
    }

    #[test]
    #[should_panic(expected = "unrecoverable")]
    fn test_panic_writes_then_panics() {
        let (logger, _buffer) = buffered_logger(vec![]);
        logger.panic(&"unrecoverable");
    }

    #[test]
    fn test_below_level_writes_nothing() {
        let (logger, buffer) = buffered_logger(vec![Setter::Level(Lvl::Warn)]);

        logger.debug(&"Test");
        logger.info(&"Test");
        assert_eq!(buffer.len(), 0);

        logger.warn(&"Foobar");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"warn\",\"message\":\"Foobar\"}\n"
        );
    }

    #[test]
    fn test_off_silences_leveled_output_but_not_print() {
        let (logger, buffer) = buffered_logger(vec![Setter::Level(Lvl::Off)]);

        logger.error(&"hidden");
        assert!(buffer.is_empty());

        logger.print(&"shown");
        assert_eq!(buffer.lines().len(), 1);
    }
}

mod management {
    use super::*;

    #[test]
    fn test_set_output_switches_sink() {
        let (mut logger, first) = buffered_logger(vec![]);
        logger.print(&"foo");
        logger.print(&"bar");

        let second = Buffer::new();
        logger.set_output(Sink::from(second.clone()));
        logger.print(&"baz");

        assert_eq!(
            first.contents(),
            "{\"level\":\"-\",\"message\":\"foo\"}\n{\"level\":\"-\",\"message\":\"bar\"}\n"
        );
        assert_eq!(second.contents(), "{\"level\":\"-\",\"message\":\"baz\"}\n");
    }

    #[test]
    fn test_set_output_survives_rebuild() {
        let (mut logger, first) = buffered_logger(vec![]);
        let second = Buffer::new();
        logger.set_output(Sink::from(second.clone()));
        logger.set_level(Lvl::Info);

        logger.info(&"after rebuild");

        assert!(first.is_empty());
        assert_eq!(second.lines().len(), 1);
    }

    #[test]
    fn test_set_level() {
        let (mut logger, buffer) = buffered_logger(vec![]);
        logger.debug(&"foo");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"debug\",\"message\":\"foo\"}\n"
        );

        buffer.reset();
        logger.set_level(Lvl::Warn);
        logger.debug(&"foo");

        assert_eq!(buffer.contents(), "");
        assert_eq!(logger.level(), Lvl::Warn);
    }

    #[test]
    fn test_clone_prefix_is_isolated() {
        let (mut logger, buffer) = buffered_logger(vec![]);
        logger.set_prefix("L1");
        logger.debug(&"foo");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"debug\",\"prefix\":\"L1\",\"message\":\"foo\"}\n"
        );

        buffer.reset();
        let mut clone = logger.clone_with([]);
        clone.set_prefix("L2");
        clone.debug(&"foo");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"debug\",\"prefix\":\"L2\",\"message\":\"foo\"}\n"
        );

        buffer.reset();
        logger.debug(&"foo");
        assert_eq!(logger.prefix(), "L1");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"debug\",\"prefix\":\"L1\",\"message\":\"foo\"}\n"
        );
    }

    #[test]
    fn test_clone_with_adds_setters() {
        let (logger, buffer) = buffered_logger(vec![Setter::field("service", "api")]);
        let clone = logger.clone_with([Setter::Level(Lvl::Error)]);

        clone.warn(&"dropped");
        clone.error(&"kept");
        logger.warn(&"original");

        assert_eq!(
            buffer.lines(),
            vec![
                "{\"level\":\"error\",\"service\":\"api\",\"message\":\"kept\"}".to_string(),
                "{\"level\":\"warn\",\"service\":\"api\",\"message\":\"original\"}".to_string(),
            ]
        );
    }

    #[test]
    fn test_unwrap_exposes_engine() {
        let (logger, buffer) = buffered_logger(vec![Setter::Prefix("core".into())]);
        logger.unwrap().info().int("n", 1).msg("raw");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"info\",\"prefix\":\"core\",\"n\":1,\"message\":\"raw\"}\n"
        );
    }

    #[test]
    fn test_logger_usable_as_trait_object() {
        let (logger, buffer) = buffered_logger(vec![]);
        let dynamic: Box<dyn LevelLogger> = Box::new(logger);
        dynamic.info(&"dyn");
        assert_eq!(buffer.lines().len(), 1);
    }
}

mod setters {
    use super::*;

    #[test]
    fn test_caller_points_at_call_site() {
        let (logger, buffer) = buffered_logger(vec![Setter::Caller]);
        logger.print(&"foobar");

        let line = &json_lines(&buffer)[0];
        let caller = line["caller"].as_str().unwrap();
        let (file, line_no) = caller.rsplit_once(':').unwrap();
        assert_eq!(file, file!());
        assert!(line_no.parse::<u32>().is_ok());
    }

    #[test]
    fn test_with_field() {
        let (logger, buffer) = buffered_logger(vec![Setter::field("service", "logging")]);
        logger.print(&"foobar");
        assert_eq!(json_lines(&buffer)[0]["service"], "logging");
    }

    #[test]
    fn test_with_fields() {
        let fields = json!({"host": "localhost", "port": 8080});
        let Value::Object(fields) = fields else {
            unreachable!()
        };
        let (logger, buffer) = buffered_logger(vec![Setter::Fields(fields)]);
        logger.print(&"foobar");

        let line = &json_lines(&buffer)[0];
        assert_eq!(line["host"], "localhost");
        assert_eq!(line["port"], 8080);
    }

    #[test]
    fn test_with_hook_sees_level_and_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let (logger, _buffer) = buffered_logger(vec![Setter::hook_fn(move |_, level, message| {
            recorder.lock().unwrap().push((level, message.to_string()));
        })]);

        logger.info(&"Foo");
        logger.warn(&"Bar");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Level::Info, "Foo".to_string()), (Level::Warn, "Bar".to_string())]
        );
    }

    #[test]
    fn test_with_prefix() {
        let (logger, buffer) = buffered_logger(vec![Setter::Prefix("Test".into())]);
        logger.warn(&"Foobar");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"warn\",\"prefix\":\"Test\",\"message\":\"Foobar\"}\n"
        );
    }

    #[test]
    fn test_with_timestamp() {
        let (logger, buffer) = buffered_logger(vec![Setter::Timestamp]);
        logger.print(&"foobar");

        let line = &json_lines(&buffer)[0];
        let time = line["time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
    }
}
