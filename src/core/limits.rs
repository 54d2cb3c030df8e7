/*!
 * Launcher Limits and Constants
 *
 * Centralized location for sizing defaults and tuning knobs.
 * Organized by subsystem.
 *
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 * - Performance-relevant values are marked with [PERF]
 */

// =============================================================================
// MEMORY GEOMETRY
// =============================================================================

/// Fallback page size (4KB)
/// Used when sysconf cannot report the page size
/// [LINUX-COMPAT] Matches the common x86-64/aarch64 page
pub const PAGE_SIZE_DEFAULT: usize = 4096;

/// Default allocation block (8KB)
/// Effective block size is max(block default, page size)
pub const BLOCK_SIZE_DEFAULT: usize = 8192;

/// Default geometric growth factor (as a shift)
/// calc_growth() pre-reserves `item << factor` bytes for large items
/// [PERF] Amortizes reallocation for repeated small appends
pub const GROWTH_FACTOR_DEFAULT: u32 = 10;

/// Largest accepted growth factor is below half the word width
pub const GROWTH_FACTOR_LIMIT: u32 = usize::BITS / 2;

// =============================================================================
// ARGUMENT LIMITS
// =============================================================================

/// Pointer-sized slots kept free at the end of the argument vector
pub const ARGC_PADDING: usize = 4;

/// Environment headroom (half a default page)
/// Added when the rounded environment leaves less than this much slack,
/// and used alone when the child runs with an empty environment
pub const ENV_HEADROOM: usize = PAGE_SIZE_DEFAULT / 2;

/// Single argument buffer, in pages (32 pages = 128KB on 4KB pages)
/// [LINUX-COMPAT] Matches MAX_ARG_STRLEN
pub const ARG_BUFFER_PAGES: usize = 32;

/// Fallback argument space when neither sysconf nor RLIMIT_STACK answer
pub const ARG_MAX_FALLBACK: usize = (i64::MAX >> 1) as usize;

/// Divisor applied to RLIMIT_STACK when deriving argument space
/// [LINUX-COMPAT] The kernel allows a quarter of the stack for argv/envp
pub const STACK_ARG_DIVISOR: usize = 4;

// =============================================================================
// EXIT STATUS
// =============================================================================

/// Base added to a terminating signal number to form an exit status
pub const SIGNAL_EXIT_BASE: i32 = 128;
