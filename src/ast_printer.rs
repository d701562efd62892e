use crate::ast::{ArrayInitializer, Expr, Stmt};

/// Renders trees in parenthesised prefix form, e.g. `(+ 1 (* 2 3))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal { value, .. } => value.to_string(),

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping { inner, .. } => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary {
                operator, right, ..
            } => format!("({} {})", operator.lexeme, Self::print(right)),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            }
            | Expr::Logical {
                left,
                operator,
                right,
                ..
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Index { name, index, .. } => {
                format!("(index {} {})", name.lexeme, Self::print(index))
            }

            Expr::Assign {
                name, index, value, ..
            } => match index {
                Some(index) => format!(
                    "(= (index {} {}) {})",
                    name.lexeme,
                    Self::print(index),
                    Self::print(value)
                ),
                None => format!("(= {} {})", name.lexeme, Self::print(value)),
            },

            Expr::ArrayAssign { name, elements, .. } => {
                format!("(= {} {})", name.lexeme, Self::list(elements))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Block(statements) => {
                let mut s = String::from("(block");
                for stmt in statements {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(stmt));
                }
                s.push(')');
                s
            }

            Stmt::Var {
                name,
                ty,
                initializer,
            } => match initializer {
                Some(expr) => format!("(var {} {} {})", ty, name.lexeme, Self::print(expr)),
                None => format!("(var {} {})", ty, name.lexeme),
            },

            Stmt::Array {
                name,
                ty,
                initializer,
            } => match initializer {
                Some(ArrayInitializer::Elements(elements)) => {
                    format!("(var {} {} {})", ty, name.lexeme, Self::list(elements))
                }
                Some(ArrayInitializer::Value(expr)) => {
                    format!("(var {} {} {})", ty, name.lexeme, Self::print(expr))
                }
                None => format!("(var {} {})", ty, name.lexeme),
            },

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While {
                condition, body, ..
            } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", Self::print(expr)),
                None => "(return)".into(),
            },

            Stmt::Break(_) => "(break)".into(),

            Stmt::Continue(_) => "(continue)".into(),

            Stmt::Function(decl) => {
                let params: Vec<String> = decl
                    .params
                    .iter()
                    .zip(&decl.param_types)
                    .map(|(p, ty)| format!("{} {}", ty, p.lexeme))
                    .collect();

                let mut s = format!(
                    "(fun {} {} ({})",
                    decl.return_type,
                    decl.name.lexeme,
                    params.join(", ")
                );
                for stmt in &decl.body {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(stmt));
                }
                s.push(')');
                s
            }
        }
    }

    fn list(elements: &[Expr]) -> String {
        let items: Vec<String> = elements.iter().map(Self::print).collect();
        format!("{{{}}}", items.join(" "))
    }
}
