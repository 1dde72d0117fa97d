//! Debug pretty-printer for parsed trees.
//!
//! Renders expressions and statements as parenthesized prefix forms, one
//! statement per line.  Purely diagnostic; the interpreter logs the
//! rendering of every parsed program at debug level.

use std::fmt::Write;

use crate::ast::{Expr, FunDef, Stmt};

pub fn program(stmts: &[Stmt]) -> String {
    stmts.iter().map(stmt).collect::<Vec<_>>().join("\n")
}

pub fn stmt(s: &Stmt) -> String {
    match s {
        Stmt::Nop => "(nop)".to_string(),
        Stmt::Expr(e) => format!("(expr {})", expr(e)),
        Stmt::Print(e, _) => format!("(print {})", expr(e)),
        Stmt::VarDecl(name, None) => format!("(var {})", name),
        Stmt::VarDecl(name, Some(init)) => format!("(var {} {})", name, expr(init)),
        Stmt::FunDecl(def) => fun_def("fun", def),
        Stmt::ClassDecl(def) => {
            let mut out = String::new();
            let _ = write!(out, "(class {}", def.name);
            if let Some(superclass) = &def.superclass {
                let _ = write!(out, " (< {})", superclass.sym);
            }
            for method in &def.methods {
                let _ = write!(out, " {}", fun_def("method", method));
            }
            out.push(')');
            out
        }
        Stmt::Block(stmts) => {
            let mut out = String::from("(block");
            for s in stmts {
                let _ = write!(out, " {}", stmt(s));
            }
            out.push(')');
            out
        }
        Stmt::If(cond, then_branch, else_branch) => match else_branch.as_ref() {
            Stmt::Nop => format!("(if {} {})", expr(cond), stmt(then_branch)),
            _ => format!(
                "(if {} {} {})",
                expr(cond),
                stmt(then_branch),
                stmt(else_branch)
            ),
        },
        Stmt::While(cond, body) => format!("(while {} {})", expr(cond), stmt(body)),
        Stmt::Return(None, _) => "(return)".to_string(),
        Stmt::Return(Some(e), _) => format!("(return {})", expr(e)),
    }
}

fn fun_def(tag: &str, def: &FunDef) -> String {
    let mut out = String::new();
    let _ = write!(out, "({} {} (", tag, def.name);
    for (i, param) in def.params.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", param);
    }
    out.push(')');
    for s in &def.body {
        let _ = write!(out, " {}", stmt(s));
    }
    out.push(')');
    out
}

pub fn expr(e: &Expr) -> String {
    match e {
        Expr::Nil => "nil".to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Number(n) => n.to_string(),
        Expr::Str(s) => format!("\"{}\"", s),
        Expr::Var(name) => name.sym.to_string(),
        Expr::Assign(name, value) => format!("(assign {} {})", name.sym, expr(value)),
        Expr::Not(inner) => format!("(! {})", expr(inner)),
        Expr::Neg(inner, _) => format!("(- {})", expr(inner)),
        Expr::Add(l, r, _) => format!("(+ {} {})", expr(l), expr(r)),
        Expr::Sub(l, r, _) => format!("(- {} {})", expr(l), expr(r)),
        Expr::Mul(l, r, _) => format!("(* {} {})", expr(l), expr(r)),
        Expr::Div(l, r, _) => format!("(/ {} {})", expr(l), expr(r)),
        Expr::Equal(l, r) => format!("(== {} {})", expr(l), expr(r)),
        Expr::NotEqual(l, r) => format!("(!= {} {})", expr(l), expr(r)),
        Expr::Less(l, r, _) => format!("(< {} {})", expr(l), expr(r)),
        Expr::LessEqual(l, r, _) => format!("(<= {} {})", expr(l), expr(r)),
        Expr::Greater(l, r, _) => format!("(> {} {})", expr(l), expr(r)),
        Expr::GreaterEqual(l, r, _) => format!("(>= {} {})", expr(l), expr(r)),
        Expr::And(l, r) => format!("(and {} {})", expr(l), expr(r)),
        Expr::Or(l, r) => format!("(or {} {})", expr(l), expr(r)),
        Expr::Group(inner) => format!("(group {})", expr(inner)),
        Expr::Call(callee, args, _) => {
            let mut out = String::new();
            let _ = write!(out, "(call {}", expr(callee));
            for arg in args {
                let _ = write!(out, " {}", expr(arg));
            }
            out.push(')');
            out
        }
        Expr::Get(object, name, _) => format!("(get {} {})", expr(object), name),
        Expr::Set(object, name, value, _) => {
            format!("(set {} {} {})", expr(object), name, expr(value))
        }
        Expr::This(_) => "this".to_string(),
        Expr::Super(_, method) => format!("(super {})", method),
    }
}
