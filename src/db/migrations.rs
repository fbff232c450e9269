// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed schema for the Learn Together database.
//!
//! Every statement is safe to re-run: tables and indexes use `IF NOT EXISTS`
//! and policies are created inside a `pg_policies` existence check (Postgres
//! has no `CREATE POLICY IF NOT EXISTS`).

use crate::db::SchemaAdmin;
use crate::error::AppError;

/// One named DDL statement.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub name: &'static str,
    pub sql: &'static str,
}

pub const SCHEMA: &[MigrationStep] = &[
    MigrationStep {
        name: "extension_uuid_ossp",
        sql: r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp";"#,
    },
    MigrationStep {
        name: "table_users",
        sql: r#"CREATE TABLE IF NOT EXISTS public.users (
    id UUID PRIMARY KEY REFERENCES auth.users ON DELETE CASCADE,
    full_name TEXT,
    email TEXT UNIQUE,
    bio TEXT,
    avatar_url TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL,
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL
);"#,
    },
    MigrationStep {
        name: "table_profiles",
        sql: r#"CREATE TABLE IF NOT EXISTS public.profiles (
    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
    user_id UUID NOT NULL UNIQUE REFERENCES auth.users(id) ON DELETE CASCADE,
    email TEXT NOT NULL DEFAULT '',
    full_name TEXT NOT NULL DEFAULT '',
    avatar_url TEXT NOT NULL DEFAULT '',
    bio TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL,
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL
);"#,
    },
    MigrationStep {
        name: "table_skills",
        sql: r#"CREATE TABLE IF NOT EXISTS public.skills (
    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
    name TEXT NOT NULL UNIQUE,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL
);"#,
    },
    MigrationStep {
        name: "table_user_skills",
        sql: r#"CREATE TABLE IF NOT EXISTS public.user_skills (
    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
    user_id UUID NOT NULL REFERENCES public.users(id) ON DELETE CASCADE,
    skill_id UUID NOT NULL REFERENCES public.skills(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('learn', 'teach')),
    created_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL,
    UNIQUE (user_id, skill_id, role)
);"#,
    },
    MigrationStep {
        name: "table_matches",
        sql: r#"CREATE TABLE IF NOT EXISTS public.matches (
    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
    user_a UUID NOT NULL REFERENCES public.users(id) ON DELETE CASCADE,
    user_b UUID NOT NULL REFERENCES public.users(id) ON DELETE CASCADE,
    skill_id UUID NOT NULL REFERENCES public.skills(id) ON DELETE CASCADE,
    matched_on TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL,
    UNIQUE (user_a, user_b, skill_id),
    CHECK (user_a < user_b)
);"#,
    },
    MigrationStep {
        name: "table_calendar_tokens",
        sql: r#"CREATE TABLE IF NOT EXISTS public.calendar_tokens (
    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
    user_id UUID NOT NULL REFERENCES auth.users(id) ON DELETE CASCADE,
    access_token TEXT NOT NULL,
    refresh_token TEXT,
    expires_at TIMESTAMP WITH TIME ZONE,
    provider TEXT NOT NULL DEFAULT 'google',
    created_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL,
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT TIMEZONE('utc'::text, NOW()) NOT NULL,
    UNIQUE (user_id, provider)
);"#,
    },
    MigrationStep {
        name: "index_user_skills_user_role",
        sql: "CREATE INDEX IF NOT EXISTS idx_user_skills_user_role ON public.user_skills (user_id, role);",
    },
    MigrationStep {
        name: "rls_enable",
        sql: r#"ALTER TABLE public.users ENABLE ROW LEVEL SECURITY;
ALTER TABLE public.profiles ENABLE ROW LEVEL SECURITY;
ALTER TABLE public.calendar_tokens ENABLE ROW LEVEL SECURITY;"#,
    },
    MigrationStep {
        name: "policy_users_select_own",
        sql: r#"DO $$ BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_policies WHERE schemaname = 'public' AND tablename = 'users' AND policyname = 'Users can view their own profile') THEN
        CREATE POLICY "Users can view their own profile" ON public.users FOR SELECT USING (auth.uid() = id);
    END IF;
END $$;"#,
    },
    MigrationStep {
        name: "policy_users_update_own",
        sql: r#"DO $$ BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_policies WHERE schemaname = 'public' AND tablename = 'users' AND policyname = 'Users can update their own profile') THEN
        CREATE POLICY "Users can update their own profile" ON public.users FOR UPDATE USING (auth.uid() = id) WITH CHECK (auth.uid() = id);
    END IF;
END $$;"#,
    },
    MigrationStep {
        name: "policy_profiles_own",
        sql: r#"DO $$ BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_policies WHERE schemaname = 'public' AND tablename = 'profiles' AND policyname = 'Users can manage their own profile') THEN
        CREATE POLICY "Users can manage their own profile" ON public.profiles FOR ALL USING (auth.uid() = user_id) WITH CHECK (auth.uid() = user_id);
    END IF;
END $$;"#,
    },
    MigrationStep {
        name: "policy_calendar_tokens_own",
        sql: r#"DO $$ BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_policies WHERE schemaname = 'public' AND tablename = 'calendar_tokens' AND policyname = 'Users can manage their own calendar tokens') THEN
        CREATE POLICY "Users can manage their own calendar tokens" ON public.calendar_tokens FOR ALL USING (auth.uid() = user_id) WITH CHECK (auth.uid() = user_id);
    END IF;
END $$;"#,
    },
];

/// Run every schema step in order, stopping at the first failure.
///
/// Returns the number of steps executed.
pub async fn run_migrations<A: SchemaAdmin + ?Sized>(admin: &A) -> Result<usize, AppError> {
    for step in SCHEMA {
        tracing::debug!(step = step.name, "Running migration step");
        admin.execute_sql(step.sql).await.map_err(|e| {
            tracing::error!(step = step.name, error = %e, "Migration step failed");
            e
        })?;
    }

    tracing::info!(steps = SCHEMA.len(), "Database schema initialized");
    Ok(SCHEMA.len())
}
