//! End-to-end parse and diff behaviour on small C sources.

use entlog_cparse::{diff_sources, parse_source, BlockKind, ChangeAction, ChangeRecord};

const OPEN_C: &str = r#"/* Copyright (C) 2018 Free Software Foundation, Inc.
   This file is part of the GNU C Library.  */

#include <errno.h>
#include <fcntl.h>
#include "local.h"

#ifndef __ASSUME_FOO
# define FOO_FALLBACK 1
#endif

static int counter attribute_hidden;

struct state
{
  int fd;
  union
  {
    long l;
    void *p;
  } u;
};

static const char *const names[] =
{
  "one",
  "two"
};

int
__open_nocancel (const char *file, int oflag, ...)
{
  int mode = 0;
  if (oflag & O_CREAT)
    {
      mode = 1;
    }
  return INLINE_SYSCALL (openat, 4, AT_FDCWD, file, oflag, mode);
}
libc_hidden_def (__open_nocancel)

#ifdef SHARED
extern void (*__hook) (void *ptr);
weak_alias (__open_nocancel, open_nocancel)
#else
extern int __libc_enable_secure;
#endif
"#;

fn lines(records: &[ChangeRecord]) -> Vec<String> {
    records.iter().map(ToString::to_string).collect()
}

#[test]
fn glibc_style_file_tree() {
    let tree = parse_source(OPEN_C);
    assert_eq!(
        tree.dump(),
        "\
Scope:
    INCLUDE: errno.h
    INCLUDE: fcntl.h
    INCLUDE: local.h
    Scope: !__ASSUME_FOO
        DEFINE: FOO_FALLBACK
    EndScope: !__ASSUME_FOO
    DECL: counter
    COMPOSITE: state
    ASSIGN: names
    FUNC: __open_nocancel
    MACROCALL: libc_hidden_def
    Scope: SHARED
        DECL: __hook
        MACROCALL: weak_alias
    EndScope: SHARED
    Scope: !(SHARED)
        DECL: __libc_enable_secure
    EndScope: !(SHARED)
EndScope:
"
    );
}

#[test]
fn glibc_style_file_changes() {
    let new = OPEN_C
        .replace("# define FOO_FALLBACK 1\n", "")
        .replace("mode = 1;", "mode = 0644;")
        .replace(
            "weak_alias (__open_nocancel, open_nocancel)\n",
            "weak_alias (__open_nocancel, open_nocancel)\nlibc_hidden_weak (open_nocancel)\n",
        );
    let records = diff_sources(OPEN_C, &new);
    assert_eq!(
        lines(&records),
        vec![
            "[!__ASSUME_FOO](FOO_FALLBACK): Removed.",
            "(__open_nocancel): Modified.",
            "[SHARED](libc_hidden_weak): New.",
        ]
    );
}

#[test]
fn declaration_added_inside_condition() {
    let records = diff_sources("#ifdef X\nint a;\n#endif", "#ifdef X\nint a;\nint b;\n#endif");
    assert_eq!(
        records,
        vec![ChangeRecord {
            name: "b".into(),
            kind: BlockKind::Declaration,
            action: ChangeAction::Added,
            scope: vec!["X".into()],
        }]
    );
}

#[test]
fn function_body_change_is_modified() {
    let records = diff_sources("void f(void) { return; }", "void f(void) { return 1; }");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "f");
    assert_eq!(records[0].kind, BlockKind::FunctionDefinition);
    assert_eq!(records[0].action, ChangeAction::Modified);
    assert!(records[0].scope.is_empty());
}

#[test]
fn changed_condition_is_remove_plus_add() {
    let records = diff_sources("#if A\nint x;\n#endif", "#if B\nint x;\n#endif");
    assert_eq!(lines(&records), vec!["[A](x): Removed.", "[B](x): New."]);
}

#[test]
fn unchanged_composite_yields_nothing() {
    let source = "struct s { int a; };";
    assert!(diff_sources(source, source).is_empty());
}

#[test]
fn bare_macro_call_argument_change() {
    let records = diff_sources("EXPORT(f)", "EXPORT(f, 2)");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "EXPORT");
    assert_eq!(records[0].kind, BlockKind::BareMacroInvocation);
    assert_eq!(records[0].action, ChangeAction::Modified);
}

#[test]
fn comparing_a_file_with_itself_is_empty() {
    assert!(diff_sources(OPEN_C, OPEN_C).is_empty());
}

#[test]
fn swapping_sides_inverts_actions() {
    let old = "#ifdef A\nint a;\n#define M 1\n#endif\nint keep;\nvoid f (int x) { }\n";
    let new = "#ifdef A\n#define M 2\n#endif\nint keep;\nvoid f (int x) { x++; }\nint added;\n";

    let forward = diff_sources(old, new);
    let backward = diff_sources(new, old);
    assert_eq!(forward.len(), backward.len());
    for record in &forward {
        let mirrored = ChangeRecord {
            action: record.action.inverse(),
            ..record.clone()
        };
        assert!(backward.contains(&mirrored), "missing mirror of {record}");
    }
}

#[test]
fn consumed_bodies_have_balanced_braces() {
    let tree = parse_source(OPEN_C);
    let bodies: Vec<_> = tree
        .iter()
        .filter(|(_, b)| {
            matches!(
                b.kind(),
                BlockKind::FunctionDefinition | BlockKind::CompositeType
            )
        })
        .collect();
    assert_eq!(bodies.len(), 2);
    for (_, block) in bodies {
        let text = block.raw_text();
        assert_eq!(
            text.matches('{').count(),
            text.matches('}').count(),
            "unbalanced: {text}"
        );
    }
}

#[test]
fn record_scope_matches_nesting() {
    let old = "#if A\n#ifndef B\n#else\n#endif\n#endif\n";
    let new = "#if A\n#ifndef B\n#else\nint deep;\n#endif\n#endif\n";
    let records = diff_sources(old, new);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].scope, vec!["A", "!(!B)"]);
    assert_eq!(records[0].to_string(), "[A][!(!B)](deep): New.");
}

#[test]
fn same_name_across_kinds_is_not_paired() {
    let records = diff_sources("#define FOO 1\n", "void FOO (int x) { }\n");
    let actions: Vec<_> = records.iter().map(|r| (r.kind, r.action)).collect();
    assert_eq!(
        actions,
        vec![
            (BlockKind::MacroDefine, ChangeAction::Removed),
            (BlockKind::FunctionDefinition, ChangeAction::Added),
        ]
    );
}
