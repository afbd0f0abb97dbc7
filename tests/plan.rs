use stonebox_limiter::{
    Command, EnvSnapshot, LaunchError, LaunchPlan, ResourceLimits, EXEC_ARGS, MEMORY_LIMIT_MB,
    PROCESS_LIMIT,
};

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

fn snapshot(vars: &[(&str, &str)]) -> EnvSnapshot {
    EnvSnapshot::from_vars(vars.iter().copied())
}

fn parse_args(raw: &str) -> Result<Command, LaunchError> {
    Command::from_json(OsStr::new(raw))
}

mod test_limits {
    use super::*;

    #[test]
    fn test_memory_limit_in_bytes() {
        let limits = ResourceLimits::from_snapshot(&snapshot(&[(MEMORY_LIMIT_MB, "256")]));
        assert_eq!(limits.address_space, Some(256 * 1024 * 1024));
        assert_eq!(limits.max_processes, None);
    }

    #[test]
    fn test_process_limit() {
        let limits = ResourceLimits::from_snapshot(&snapshot(&[(PROCESS_LIMIT, " 64 ")]));
        assert_eq!(limits.address_space, None);
        assert_eq!(limits.max_processes, Some(64));
    }

    #[test]
    fn test_invalid_values_are_dropped() {
        let limits = ResourceLimits::from_snapshot(&snapshot(&[
            (MEMORY_LIMIT_MB, "not_a_number"),
            (PROCESS_LIMIT, "-3"),
        ]));
        assert_eq!(limits, ResourceLimits::default());
    }

    #[test]
    fn test_memory_limit_overflow() {
        let huge = u64::MAX.to_string();
        let limits = ResourceLimits::from_snapshot(&snapshot(&[(MEMORY_LIMIT_MB, huge.as_str())]));
        assert_eq!(limits.address_space, None);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let limits =
            ResourceLimits::from_snapshot(&snapshot(&[(MEMORY_LIMIT_MB, ""), (PROCESS_LIMIT, "")]));
        assert_eq!(limits, ResourceLimits::default());
    }
}

mod test_command {
    use super::*;

    #[test]
    fn test_argv() {
        let cmd = parse_args(r#"["/bin/echo", "hello", "world"]"#).unwrap();
        assert_eq!(cmd.program(), "/bin/echo");
        assert_eq!(cmd.argv(), ["/bin/echo", "hello", "world"]);
    }

    #[test]
    fn test_missing() {
        let err = Command::from_snapshot(&snapshot(&[])).unwrap_err();
        assert_eq!(err.exit_code(), 120);
        assert!(err.to_string().contains(EXEC_ARGS));

        let err = Command::from_snapshot(&snapshot(&[(EXEC_ARGS, "")])).unwrap_err();
        assert_eq!(err.exit_code(), 120);
    }

    #[test]
    fn test_invalid_shapes() {
        let cases = [
            "not valid json",
            r#"{"cmd": "/bin/echo"}"#,
            r#""/bin/echo""#,
            r#"["/bin/echo", 1]"#,
            r#"["/bin/echo", null]"#,
            "[]",
            r#"["/bin/echo", "a\u0000b"]"#,
        ];
        for raw in cases.iter() {
            let err = parse_args(raw).unwrap_err();
            assert_eq!(err.exit_code(), 121, "input = {}", raw);
        }
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Command>("[]").is_err());
        assert!(serde_json::from_str::<Command>(r#"["a\u0000b"]"#).is_err());

        let plan = r#"{"limits":{"address_space":null,"max_processes":null},"command":["a\u0000b"]}"#;
        assert!(serde_json::from_str::<LaunchPlan>(plan).is_err());

        let cmd: Command = serde_json::from_str(r#"["/bin/echo","hi"]"#).unwrap();
        assert_eq!(cmd.program(), "/bin/echo");
    }
}

mod test_snapshot {
    use super::*;

    use std::ffi::OsString;

    #[test]
    fn test_scrubbed_vars() {
        let snap = snapshot(&[
            ("PATH", "/usr/bin:/bin"),
            (MEMORY_LIMIT_MB, "128"),
            (EXEC_ARGS, r#"["env"]"#),
            ("KEEP_ME", "1"),
        ]);
        let keys: Vec<OsString> = snap.scrubbed_vars().map(|(k, _)| k.to_owned()).collect();
        assert_eq!(keys, ["PATH", "KEEP_ME"]);
    }

    #[test]
    fn test_env_file_fills_missing_keys() {
        let path = std::env::temp_dir().join(format!("stonebox_env_{}", std::process::id()));
        fs::write(
            &path,
            "STONEBOX_EXEC_ARGS='[\"/bin/echo\",\"from-file\"]'\n\
             STONEBOX_MEMORY_LIMIT_MB=64\n\
             UNRELATED=1\n",
        )
        .unwrap();

        let mut snap = snapshot(&[(MEMORY_LIMIT_MB, "32")]);
        snap.merge_env_file(&path);
        fs::remove_file(&path).unwrap();

        let plan = LaunchPlan::from_snapshot(&snap).unwrap();
        assert_eq!(plan.command.argv(), ["/bin/echo", "from-file"]);
        assert_eq!(plan.limits.address_space, Some(32 * 1024 * 1024));
        assert_eq!(snap.scrubbed_vars().count(), 0);
    }

    #[test]
    fn test_env_file_fills_empty_keys() {
        let path = std::env::temp_dir().join(format!("stonebox_env_empty_{}", std::process::id()));
        fs::write(&path, "STONEBOX_EXEC_ARGS='[\"true\"]'\n").unwrap();

        let mut snap = snapshot(&[(EXEC_ARGS, "")]);
        snap.merge_env_file(&path);
        fs::remove_file(&path).unwrap();

        let plan = LaunchPlan::from_snapshot(&snap).unwrap();
        assert_eq!(plan.command.argv(), ["true"]);
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let mut snap = snapshot(&[(EXEC_ARGS, r#"["true"]"#)]);
        snap.merge_env_file(Path::new("/definitely/not/a/real/env/file"));
        assert!(LaunchPlan::from_snapshot(&snap).is_ok());
    }
}
